// vcorp-auth — authentication, enrollment, and billing for the VCorp
// membership network.
//
// One identity, many programs: users sign in with a magic link or a
// short-lived PIN, carry a JWT session cookie across program sites, and
// unlock program features by onboarding with a payment method. A scheduled
// sweep collects recurring charges and a payment webhook credits balances.

pub mod context;
pub mod cookies;
pub mod crypto;
pub mod enrollment;
pub mod mailer;
pub mod payments;
pub mod profile;
pub mod resolver;
pub mod routes;
pub mod session;
pub mod verification;

pub use context::AuthContext;
