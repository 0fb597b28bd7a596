// Session tokens.
//
// A session is a stateless HS256 JWT carried in the session cookie. The
// claims embed a snapshot of the user's identity, account status, and
// program entitlements so program sites can act on it without a store
// round-trip. The snapshot can go stale until refreshed; the session
// lifetime bounds the staleness window, and any flow that mutates
// memberships re-mints the token.

use serde::{Deserialize, Serialize};

use vcorp_core::db::models::User;
use vcorp_core::error::VcorpError;
use vcorp_core::program::{AccountStatus, MembershipStatus, ProgramId};

use crate::context::AuthContext;
use crate::crypto::jwt;

/// One program entitlement inside the session snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgramClaim {
    pub program: ProgramId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    pub status: MembershipStatus,
}

/// Payment method summary inside the session snapshot. Display
/// metadata only; the raw card never passes through this system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentClaim {
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_last4: Option<String>,
}

/// The identity snapshot embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub status: AccountStatus,
    pub email_verified: bool,
    #[serde(default)]
    pub programs: Vec<ProgramClaim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentClaim>,
}

impl SessionClaims {
    /// Snapshot the signable parts of a user record.
    pub fn snapshot(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            status: user.status,
            email_verified: user.email_verified.is_some(),
            programs: user
                .programs
                .iter()
                .map(|m| ProgramClaim {
                    program: m.program,
                    tier: m.tier.clone(),
                    status: m.status,
                })
                .collect(),
            payment: user.stripe_customer_id.clone().map(|customer_id| PaymentClaim {
                customer_id,
                payment_method_id: user.payment_method_id.clone(),
                card_brand: user.card_brand.clone(),
                card_last4: user.card_last4.clone(),
            }),
        }
    }
}

/// Mint a session token for a user.
pub fn mint_session_token(ctx: &AuthContext, user: &User) -> Result<String, VcorpError> {
    jwt::sign_jwt(
        &SessionClaims::snapshot(user),
        &ctx.options.secret,
        &ctx.options.session.issuer,
        &ctx.options.session.audience,
        ctx.options.session.expires_in,
    )
}

/// Validate a session token. Returns `None` for anything invalid,
/// expired, or minted for another issuer/audience — the cases are not
/// distinguished.
pub fn validate_session_token(ctx: &AuthContext, token: &str) -> Option<SessionClaims> {
    jwt::verify_jwt(
        token,
        &ctx.options.secret,
        &ctx.options.session.issuer,
        &ctx.options.session.audience,
    )
}

/// Re-sign a valid token's payload with a fresh expiry. The snapshot is
/// carried over as-is; callers that just mutated the user should prefer
/// [`mint_session_token`] with the fresh record.
pub fn refresh_session_token(
    ctx: &AuthContext,
    token: &str,
) -> Result<Option<String>, VcorpError> {
    match validate_session_token(ctx, token) {
        Some(claims) => jwt::sign_jwt(
            &claims,
            &ctx.options.secret,
            &ctx.options.session.issuer,
            &ctx.options.session.audience,
            ctx.options.session.expires_in,
        )
        .map(Some),
        None => Ok(None),
    }
}
