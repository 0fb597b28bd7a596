// Typed persistence models.
//
// Documents are stored through the schema-agnostic adapter as JSON values;
// these structs give handlers a typed view and one place for field naming.
// All wire and storage names are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VcorpError;
use crate::program::{AccountStatus, ChargeFrequency, MembershipStatus, ProgramId};

/// Collection name for user documents.
pub const USERS: &str = "users";
/// Collection name for the payment webhook dedupe ledger.
pub const PROCESSED_PAYMENT_EVENTS: &str = "processed_payment_events";

// ─── User ────────────────────────────────────────────────────────

/// Postal address on a user profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

/// A user's membership in one program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramMembership {
    pub program: ProgramId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default)]
    pub status: MembershipStatus,
    pub joined_at: DateTime<Utc>,
    /// Program-specific payload, e.g. the parent account id once onboarded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_data: Option<ProgramData>,
}

/// Program-specific membership payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// The central identity record, shared across all programs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(default)]
    pub address: Address,

    /// When the email was verified. `None` means unverified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub identity_verified: bool,
    #[serde(default)]
    pub status: AccountStatus,
    /// Weighted 0-100 profile checklist score.
    #[serde(default)]
    pub profile_completeness: u8,

    /// Outstanding magic-link token, single-use per issue but reusable
    /// within its validity window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_token_expiry: Option<DateTime<Utc>>,
    /// Hashed sign-in PIN. Cleared on successful verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_pin_expiry: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    /// Default saved payment method, with display metadata for the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_last4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,

    #[serde(default)]
    pub programs: Vec<ProgramMembership>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The user's membership record for a program, if any.
    pub fn membership(&self, program: ProgramId) -> Option<&ProgramMembership> {
        self.programs.iter().find(|m| m.program == program)
    }

    pub fn has_active_membership(&self, program: ProgramId) -> bool {
        self.membership(program)
            .map(|m| m.status == MembershipStatus::Active)
            .unwrap_or(false)
    }
}

// ─── Program Account ─────────────────────────────────────────────

/// Recurring-charge settings on a program account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoCharge {
    #[serde(default)]
    pub enabled: bool,
    /// Charge amount in dollars.
    #[serde(default)]
    pub amount: f64,
    #[serde(default = "default_frequency")]
    pub frequency: ChargeFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_charge_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_charge_date: Option<DateTime<Utc>>,
}

fn default_frequency() -> ChargeFrequency {
    ChargeFrequency::Monthly
}

impl Default for AutoCharge {
    fn default() -> Self {
        Self {
            enabled: false,
            amount: 0.0,
            frequency: default_frequency(),
            next_charge_date: None,
            last_charge_date: None,
        }
    }
}

/// A per-program billing account, stored in that program's own collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramAccount {
    pub id: String,
    /// Owning user id.
    pub user_id: String,
    pub program: ProgramId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
    /// Spendable point balance, credited by payment webhooks.
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub auto_charge: AutoCharge,
    #[serde(default)]
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgramAccount {
    /// Whether the account is due for a recurring charge at `now`.
    pub fn is_charge_due(&self, now: DateTime<Utc>) -> bool {
        self.auto_charge.enabled
            && self.auto_charge.amount > 0.0
            && self
                .auto_charge
                .next_charge_date
                .map(|d| d <= now)
                .unwrap_or(false)
    }
}

// ─── Dependent ───────────────────────────────────────────────────

/// A child/student attached to a program account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependent {
    pub id: String,
    /// The owning program account id.
    pub account_id: String,
    pub program: ProgramId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ─── Processed Payment Event ─────────────────────────────────────

/// Dedupe ledger row for payment webhook deliveries. One row per
/// provider event id; a second delivery finds the row and becomes a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedPaymentEvent {
    pub id: String,
    /// The payment provider's event id.
    pub event_id: String,
    pub processed_at: DateTime<Utc>,
}

// ─── Value Conversions ───────────────────────────────────────────

/// Serialize a model into the adapter's JSON representation.
pub fn to_value<T: Serialize>(model: &T) -> Result<serde_json::Value, VcorpError> {
    serde_json::to_value(model).map_err(|e| VcorpError::Database(e.to_string()))
}

/// Deserialize a model from the adapter's JSON representation.
pub fn from_value<T: for<'de> Deserialize<'de>>(
    value: serde_json::Value,
) -> Result<T, VcorpError> {
    serde_json::from_value(value).map_err(|e| VcorpError::Database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_user() -> User {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        User {
            id: "u1".into(),
            email: "parent@example.com".into(),
            first_name: Some("Ada".into()),
            last_name: None,
            phone: None,
            date_of_birth: None,
            address: Address::default(),
            email_verified: None,
            identity_verified: false,
            status: AccountStatus::Pending,
            profile_completeness: 0,
            login_token: None,
            login_token_expiry: None,
            login_pin: None,
            login_pin_expiry: None,
            stripe_customer_id: None,
            payment_method_id: None,
            card_brand: None,
            card_last4: None,
            last_login: None,
            programs: vec![ProgramMembership {
                program: ProgramId::Fyht4,
                tier: None,
                status: MembershipStatus::Active,
                joined_at: now,
                program_data: None,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_user_serde_camel_case() {
        let value = to_value(&sample_user()).unwrap();
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["programs"][0]["program"], "fyht4");
        // None fields are omitted entirely, unverified email included.
        assert!(value.get("emailVerified").is_none());
        assert!(value.get("lastName").is_none());
    }

    #[test]
    fn test_user_round_trip() {
        let user = sample_user();
        let value = to_value(&user).unwrap();
        let back: User = from_value(value).unwrap();
        assert_eq!(back.id, user.id);
        assert_eq!(back.programs.len(), 1);
    }

    #[test]
    fn test_membership_lookup() {
        let user = sample_user();
        assert!(user.has_active_membership(ProgramId::Fyht4));
        assert!(!user.has_active_membership(ProgramId::SpiritOf));
        assert!(user.membership(ProgramId::Taekwondo).is_none());
    }

    #[test]
    fn test_charge_due() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let mut account = ProgramAccount {
            id: "a1".into(),
            user_id: "u1".into(),
            program: ProgramId::SpiritOf,
            tier: None,
            stripe_customer_id: Some("cus_1".into()),
            payment_method_id: Some("pm_1".into()),
            balance: 0.0,
            auto_charge: AutoCharge {
                enabled: true,
                amount: 50.0,
                frequency: ChargeFrequency::Monthly,
                next_charge_date: Some(now - chrono::Duration::hours(1)),
                last_charge_date: None,
            },
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        };
        assert!(account.is_charge_due(now));

        account.auto_charge.enabled = false;
        assert!(!account.is_charge_due(now));

        account.auto_charge.enabled = true;
        account.auto_charge.amount = 0.0;
        assert!(!account.is_charge_due(now));

        account.auto_charge.amount = 50.0;
        account.auto_charge.next_charge_date = Some(now + chrono::Duration::days(1));
        assert!(!account.is_charge_due(now));
    }
}
