// Recurring billing: the scheduled sweep and the payment webhook.
//
// The sweep claims each due account by advancing its nextChargeDate with
// a conditional update before charging. A concurrent sweep (or a webhook
// racing the sweep) finds the date already advanced and skips the
// account, so double delivery never double-charges. A failed charge
// rolls the claim back so the next sweep retries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vcorp_core::db::models::{
    from_value, to_value, ProcessedPaymentEvent, ProgramAccount, PROCESSED_PAYMENT_EVENTS,
};
use vcorp_core::db::adapter::{FindManyQuery, Operator, WhereClause};
use vcorp_core::error::{ApiError, ErrorCode, VcorpError};
use vcorp_core::program::ProgramId;

use crate::context::AuthContext;
use crate::payments::{self, ChargeRequest};

// ─── Billing Sweep ───────────────────────────────────────────────

/// Aggregate outcome of one sweep run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepOutcome {
    pub successful: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

/// Run the recurring-charge sweep across all programs.
///
/// One account failing never stops the rest: charge errors are recorded
/// per item and the sweep continues.
pub async fn run_billing_sweep(
    ctx: &AuthContext,
    now: DateTime<Utc>,
) -> Result<SweepOutcome, VcorpError> {
    let mut outcome = SweepOutcome::default();

    for program in ProgramId::ALL {
        let due = find_due_accounts(ctx, program, now).await?;
        for value in due {
            let account: ProgramAccount = match from_value(value) {
                Ok(account) => account,
                Err(err) => {
                    outcome.failed += 1;
                    outcome.errors.push(format!("{program}: bad account record: {err}"));
                    continue;
                }
            };

            match charge_account(ctx, program, &account, now).await {
                Ok(true) => outcome.successful += 1,
                // Another worker claimed the account first.
                Ok(false) => {}
                Err(err) => {
                    outcome.failed += 1;
                    outcome
                        .errors
                        .push(format!("{program}/{}: {err}", account.id));
                }
            }
        }
    }

    ctx.logger.info(&format!(
        "Billing sweep complete: {} charged, {} failed",
        outcome.successful, outcome.failed
    ));

    Ok(outcome)
}

async fn find_due_accounts(
    ctx: &AuthContext,
    program: ProgramId,
    now: DateTime<Utc>,
) -> Result<Vec<serde_json::Value>, VcorpError> {
    ctx.adapter
        .find_many(
            program.account_collection(),
            FindManyQuery {
                where_clauses: vec![
                    WhereClause::eq("autoCharge.enabled", true).and(),
                    WhereClause::with_op("autoCharge.amount", Operator::Gt, 0.0).and(),
                    WhereClause::with_op(
                        "autoCharge.nextChargeDate",
                        Operator::Lte,
                        now.to_rfc3339(),
                    ),
                ],
                ..Default::default()
            },
        )
        .await
}

/// Charge one due account. Returns Ok(false) when the claim was lost to
/// a concurrent worker, Ok(true) on a successful charge.
async fn charge_account(
    ctx: &AuthContext,
    program: ProgramId,
    account: &ProgramAccount,
    now: DateTime<Utc>,
) -> Result<bool, VcorpError> {
    let customer_id = account
        .stripe_customer_id
        .clone()
        .ok_or_else(|| VcorpError::Other("account has no provider customer".into()))?;
    let payment_method_id = account
        .payment_method_id
        .clone()
        .ok_or_else(|| VcorpError::from(ApiError::bad_request(ErrorCode::MissingPaymentMethod)))?;
    let previous_date = account
        .auto_charge
        .next_charge_date
        .ok_or_else(|| VcorpError::Other("due account has no nextChargeDate".into()))?;

    let next_date = account.auto_charge.frequency.advance(now);

    // Claim: advance the schedule only if the account is still due.
    let claimed = ctx
        .adapter
        .update(
            program.account_collection(),
            &[
                WhereClause::eq("id", account.id.as_str()).and(),
                WhereClause::with_op(
                    "autoCharge.nextChargeDate",
                    Operator::Lte,
                    now.to_rfc3339(),
                ),
            ],
            serde_json::json!({
                "autoCharge.nextChargeDate": next_date.to_rfc3339(),
                "updatedAt": now.to_rfc3339(),
            }),
        )
        .await?;

    if claimed.is_none() {
        return Ok(false);
    }

    let mut metadata = std::collections::HashMap::new();
    metadata.insert("userId".to_string(), account.user_id.clone());
    metadata.insert("program".to_string(), program.to_string());

    let result = ctx
        .payments
        .charge(ChargeRequest {
            customer_id,
            payment_method_id,
            amount_cents: (account.auto_charge.amount * 100.0).round() as i64,
            description: format!("{} recurring charge", program.display_name()),
            metadata,
        })
        .await;

    match result {
        Ok(receipt) => {
            ctx.adapter
                .update(
                    program.account_collection(),
                    &[WhereClause::eq("id", account.id.as_str())],
                    serde_json::json!({
                        "autoCharge.lastChargeDate": now.to_rfc3339(),
                        "updatedAt": now.to_rfc3339(),
                    }),
                )
                .await?;
            ctx.logger.success(&format!(
                "Recurring charge {} for account {}",
                receipt.payment_id, account.id
            ));
            Ok(true)
        }
        Err(err) => {
            // Release the claim so the next sweep retries this account.
            ctx.adapter
                .update(
                    program.account_collection(),
                    &[WhereClause::eq("id", account.id.as_str())],
                    serde_json::json!({
                        "autoCharge.nextChargeDate": previous_date.to_rfc3339(),
                        "updatedAt": now.to_rfc3339(),
                    }),
                )
                .await?;
            Err(err)
        }
    }
}

// ─── Payment Webhook ─────────────────────────────────────────────

/// An inbound payment provider event.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEventData {
    pub object: PaymentObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentObject {
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub last_payment_error: Option<PaymentError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentError {
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome of processing one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WebhookOutcome {
    /// Balance credited and schedule advanced.
    Processed,
    /// Event id seen before; nothing changed.
    Duplicate,
    /// Charge failure noted for operators; no state changed.
    Recorded,
    /// Event type or metadata not relevant to billing.
    Ignored,
}

/// Verify and apply one payment webhook delivery.
///
/// The credited amount comes from the event's `magicPoints` metadata,
/// not from the provider's charge amount: promotions and point packs
/// decouple dollars from points. Redelivered events are deduplicated
/// through a ledger keyed by the provider event id. Failed-charge
/// events are logged for operators but change nothing; auto-charge
/// stays enabled and the sweep retries on schedule.
pub async fn apply_payment_webhook(
    ctx: &AuthContext,
    payload: &str,
    signature_header: &str,
    now: DateTime<Utc>,
) -> Result<WebhookOutcome, VcorpError> {
    payments::verify_webhook_signature(
        payload,
        signature_header,
        &ctx.options.billing.webhook_secret,
        ctx.options.billing.webhook_tolerance,
    )
    .map_err(|_| VcorpError::from(ApiError::unauthorized(ErrorCode::InvalidWebhookSignature)))?;

    let event: PaymentEvent = serde_json::from_str(payload)
        .map_err(|_| VcorpError::from(ApiError::bad_request(ErrorCode::CouldNotParseBody)))?;

    match event.event_type.as_str() {
        "payment_intent.succeeded" => {}
        "payment_intent.payment_failed" => {
            let metadata = &event.data.object.metadata;
            let reason = event
                .data
                .object
                .last_payment_error
                .as_ref()
                .and_then(|e| e.message.as_deref())
                .unwrap_or("no reason given");
            ctx.logger.warn(&format!(
                "Payment failed, event {} (user {}, program {}): {reason}",
                event.id,
                metadata.get("userId").map(String::as_str).unwrap_or("unknown"),
                metadata.get("program").map(String::as_str).unwrap_or("unknown"),
            ));
            return Ok(WebhookOutcome::Recorded);
        }
        _ => return Ok(WebhookOutcome::Ignored),
    }

    // Dedupe before any side effect.
    let seen = ctx
        .adapter
        .find_one(
            PROCESSED_PAYMENT_EVENTS,
            &[WhereClause::eq("eventId", event.id.as_str())],
        )
        .await?;
    if seen.is_some() {
        ctx.logger.debug(&format!("Duplicate payment event {}", event.id));
        return Ok(WebhookOutcome::Duplicate);
    }

    let metadata = &event.data.object.metadata;
    let (user_id, program, points) = match (
        metadata.get("userId"),
        metadata.get("program").and_then(|p| ProgramId::parse(p)),
        metadata.get("magicPoints").and_then(|p| p.parse::<f64>().ok()),
    ) {
        (Some(user_id), Some(program), Some(points)) => (user_id.clone(), program, points),
        _ => return Ok(WebhookOutcome::Ignored),
    };

    let ledger_row = ProcessedPaymentEvent {
        id: uuid::Uuid::new_v4().to_string(),
        event_id: event.id.clone(),
        processed_at: now,
    };
    ctx.adapter
        .create(PROCESSED_PAYMENT_EVENTS, to_value(&ledger_row)?)
        .await?;

    let credited = ctx
        .adapter
        .increment(
            program.account_collection(),
            &[WhereClause::eq("userId", user_id.as_str())],
            "balance",
            points,
        )
        .await?;

    let credited = match credited {
        Some(value) => value,
        None => {
            ctx.logger.warn(&format!(
                "Payment event {} references missing {} account for user {}",
                event.id, program, user_id
            ));
            return Ok(WebhookOutcome::Ignored);
        }
    };

    // Advance the schedule only if the sweep has not already done so.
    if let Ok(account) = from_value::<ProgramAccount>(credited) {
        if account.is_charge_due(now) {
            let next = account.auto_charge.frequency.advance(now);
            ctx.adapter
                .update(
                    program.account_collection(),
                    &[
                        WhereClause::eq("id", account.id.as_str()).and(),
                        WhereClause::with_op(
                            "autoCharge.nextChargeDate",
                            Operator::Lte,
                            now.to_rfc3339(),
                        ),
                    ],
                    serde_json::json!({
                        "autoCharge.nextChargeDate": next.to_rfc3339(),
                        "autoCharge.lastChargeDate": now.to_rfc3339(),
                        "updatedAt": now.to_rfc3339(),
                    }),
                )
                .await?;
        }
    }

    ctx.logger.success(&format!(
        "Credited {points} points to {program} account of user {user_id}"
    ));

    Ok(WebhookOutcome::Processed)
}
