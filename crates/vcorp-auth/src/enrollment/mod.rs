// Program enrollment: access gating and onboarding.
//
// A user's membership list is the gate for each program site. An access
// check for a program the user has never touched records a pending
// membership as a side effect, so staff can see interest; the check
// reports that side effect explicitly. Onboarding attaches a payment
// method, creates the program account and dependents, attempts the
// first charge without blocking, and flips the membership active.

pub mod billing;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vcorp_core::db::models::{
    from_value, to_value, AutoCharge, Dependent, ProgramAccount, ProgramData,
    ProgramMembership, User, USERS,
};
use vcorp_core::db::WhereClause;
use vcorp_core::error::{ApiError, ErrorCode, VcorpError};
use vcorp_core::program::{AccountStatus, ChargeFrequency, MembershipStatus, ProgramId};

use crate::context::AuthContext;
use crate::payments::ChargeRequest;
use crate::session::mint_session_token;

// ─── Access Gating ───────────────────────────────────────────────

/// The decision from a program access check.
#[derive(Debug, Clone)]
pub enum AccessOutcome {
    /// Active member: proceed to the program site with a session token.
    Allow {
        token: String,
        /// The trusted redirect with the token appended, when the
        /// caller supplied one.
        redirect_url: Option<String>,
    },
    /// Not onboarded yet: detour to the onboarding flow.
    RequireOnboarding { onboarding_url: String },
}

/// An access decision plus its side effect, reported explicitly so
/// callers and tests can assert on the membership creation.
#[derive(Debug, Clone)]
pub struct AccessCheck {
    pub outcome: AccessOutcome,
    /// True when this check created a pending membership.
    pub membership_created: bool,
}

/// State machine per (user, program): no record → pending on first
/// contact, pending → active via onboarding, active stays active.
///
/// `redirect` must already be trust-checked by the caller; this
/// function appends the session token for allowed members and threads
/// the target through the onboarding detour as `returnTo`.
pub async fn check_access(
    ctx: &AuthContext,
    user: &User,
    program: ProgramId,
    redirect: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AccessCheck, VcorpError> {
    if user.has_active_membership(program) {
        let token = mint_session_token(ctx, user)?;
        let redirect_url = redirect.map(|r| append_query(r, "token", &token));
        return Ok(AccessCheck {
            outcome: AccessOutcome::Allow {
                token,
                redirect_url,
            },
            membership_created: false,
        });
    }

    let membership_created = user.membership(program).is_none();
    if membership_created {
        // First contact with this program: record a pending membership.
        let mut programs = user.programs.clone();
        programs.push(ProgramMembership {
            program,
            tier: None,
            status: MembershipStatus::Pending,
            joined_at: now,
            program_data: None,
        });
        ctx.adapter
            .update(
                USERS,
                &[WhereClause::eq("id", user.id.as_str())],
                serde_json::json!({
                    "programs": to_value(&programs)?,
                    "updatedAt": now.to_rfc3339(),
                }),
            )
            .await?;
        ctx.logger.info(&format!(
            "Created pending {} membership for user {}",
            program, user.id
        ));
    }

    Ok(AccessCheck {
        outcome: AccessOutcome::RequireOnboarding {
            onboarding_url: onboarding_url(ctx, program, redirect),
        },
        membership_created,
    })
}

fn onboarding_url(ctx: &AuthContext, program: ProgramId, return_to: Option<&str>) -> String {
    let base = ctx.options.base_url.as_deref().unwrap_or("");
    match return_to {
        Some(target) => format!(
            "{base}/onboarding/{program}?returnTo={}",
            encode_query_value(target)
        ),
        None => format!("{base}/onboarding/{program}"),
    }
}

fn append_query(url: &str, key: &str, value: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}{key}={}", encode_query_value(value))
}

/// Percent-encode a query value.
pub(crate) fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

// ─── Onboarding ──────────────────────────────────────────────────

/// A dependent to enroll during onboarding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependentInput {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<DateTime<Utc>>,
}

/// Onboarding parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    /// Payment method collected by the program site. Falls back to the
    /// user's saved default when absent.
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    /// First and recurring charge amount in dollars.
    #[serde(default)]
    pub amount: f64,
    #[serde(default = "default_frequency")]
    pub frequency: ChargeFrequency,
    #[serde(default)]
    pub dependents: Vec<DependentInput>,
}

fn default_frequency() -> ChargeFrequency {
    ChargeFrequency::Monthly
}

/// Result of a completed onboarding.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingResult {
    pub account: ProgramAccount,
    pub dependents: Vec<Dependent>,
    /// Whether the immediate first charge went through. Onboarding
    /// succeeds either way; a failed charge is retried by the sweep.
    pub charge_success: bool,
}

/// Complete onboarding for a user into a program.
///
/// Fails up front on a duplicate account or a missing payment method;
/// after the account exists, the first charge is attempted but never
/// blocks completion.
pub async fn complete_onboarding(
    ctx: &AuthContext,
    user: &User,
    program: ProgramId,
    request: OnboardingRequest,
    now: DateTime<Utc>,
) -> Result<OnboardingResult, VcorpError> {
    let collection = program.account_collection();

    let existing = ctx
        .adapter
        .find_one(collection, &[WhereClause::eq("userId", user.id.as_str())])
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict(ErrorCode::AlreadyOnboarded).into());
    }

    let form_payment_method = request.payment_method_id.clone().filter(|p| !p.is_empty());
    let payment_method_id = form_payment_method
        .clone()
        .or_else(|| user.payment_method_id.clone())
        .ok_or_else(|| VcorpError::from(ApiError::bad_request(ErrorCode::MissingPaymentMethod)))?;

    // Reuse the provider customer when the user already has one.
    let (customer_id, customer_is_new) = match user.stripe_customer_id.clone() {
        Some(id) => (id, false),
        None => {
            let name = format!(
                "{} {}",
                user.first_name.as_deref().unwrap_or(""),
                user.last_name.as_deref().unwrap_or("")
            )
            .trim()
            .to_string();
            (ctx.payments.create_customer(&user.email, &name).await?, true)
        }
    };

    // Persist new payment references on the user record.
    let mut user_updates = serde_json::Map::new();
    if customer_is_new {
        user_updates.insert("stripeCustomerId".into(), serde_json::json!(customer_id));
    }
    if form_payment_method.is_some() {
        user_updates.insert("paymentMethodId".into(), serde_json::json!(payment_method_id));
    }
    if !user_updates.is_empty() {
        user_updates.insert("updatedAt".into(), serde_json::json!(now.to_rfc3339()));
        ctx.adapter
            .update(
                USERS,
                &[WhereClause::eq("id", user.id.as_str())],
                serde_json::Value::Object(user_updates),
            )
            .await?;
    }

    let auto_charge_enabled = request.amount > 0.0;
    let mut account = ProgramAccount {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        program,
        tier: request.tier.clone(),
        stripe_customer_id: Some(customer_id.clone()),
        payment_method_id: Some(payment_method_id.clone()),
        balance: 0.0,
        auto_charge: AutoCharge {
            enabled: auto_charge_enabled,
            amount: request.amount,
            frequency: request.frequency,
            next_charge_date: auto_charge_enabled.then(|| request.frequency.advance(now)),
            last_charge_date: None,
        },
        status: AccountStatus::Active,
        created_at: now,
        updated_at: now,
    };

    ctx.adapter.create(collection, to_value(&account)?).await?;

    let mut dependents = Vec::with_capacity(request.dependents.len());
    for input in request.dependents {
        let dependent = Dependent {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account.id.clone(),
            program,
            first_name: input.first_name,
            last_name: input.last_name,
            date_of_birth: input.date_of_birth,
            created_at: now,
        };
        ctx.adapter
            .create(program.dependent_collection(), to_value(&dependent)?)
            .await?;
        dependents.push(dependent);
    }

    // First charge: attempted immediately, never blocks onboarding.
    let charge_success = if auto_charge_enabled {
        let mut metadata = HashMap::new();
        metadata.insert("userId".to_string(), user.id.clone());
        metadata.insert("program".to_string(), program.to_string());
        let result = ctx
            .payments
            .charge(ChargeRequest {
                customer_id,
                payment_method_id,
                amount_cents: (request.amount * 100.0).round() as i64,
                description: format!("{} enrollment", program.display_name()),
                metadata,
            })
            .await;
        match result {
            Ok(receipt) => {
                ctx.logger.success(&format!(
                    "Onboarding charge {} succeeded for account {}",
                    receipt.payment_id, account.id
                ));
                ctx.adapter
                    .update(
                        collection,
                        &[WhereClause::eq("id", account.id.as_str())],
                        serde_json::json!({
                            "autoCharge.lastChargeDate": now.to_rfc3339(),
                            "updatedAt": now.to_rfc3339(),
                        }),
                    )
                    .await?;
                account.auto_charge.last_charge_date = Some(now);
                true
            }
            Err(err) => {
                ctx.logger.warn(&format!(
                    "Onboarding charge failed for account {}: {err}",
                    account.id
                ));
                false
            }
        }
    } else {
        false
    };

    // Flip the membership active, recording the account link.
    let mut programs = user.programs.clone();
    match programs.iter_mut().find(|m| m.program == program) {
        Some(membership) => {
            membership.status = MembershipStatus::Active;
            membership.tier = request.tier.clone();
            membership.program_data = Some(ProgramData {
                parent_id: Some(account.id.clone()),
            });
        }
        None => programs.push(ProgramMembership {
            program,
            tier: request.tier.clone(),
            status: MembershipStatus::Active,
            joined_at: now,
            program_data: Some(ProgramData {
                parent_id: Some(account.id.clone()),
            }),
        }),
    }

    ctx.adapter
        .update(
            USERS,
            &[WhereClause::eq("id", user.id.as_str())],
            serde_json::json!({
                "programs": to_value(&programs)?,
                "updatedAt": now.to_rfc3339(),
            }),
        )
        .await?;

    Ok(OnboardingResult {
        account,
        dependents,
        charge_success,
    })
}

/// Load a user's program account, if any.
pub async fn find_account(
    ctx: &AuthContext,
    user_id: &str,
    program: ProgramId,
) -> Result<Option<ProgramAccount>, VcorpError> {
    let found = ctx
        .adapter
        .find_one(
            program.account_collection(),
            &[WhereClause::eq("userId", user_id)],
        )
        .await?;
    found.map(from_value).transpose()
}
