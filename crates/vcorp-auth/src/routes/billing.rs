// Billing routes: the scheduler-triggered sweep and the payment
// webhook. Neither is session-gated; the sweep authenticates with a
// bearer secret and the webhook with its signature header.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use vcorp_core::error::{ApiError, ErrorCode};

use crate::context::AuthContext;
use crate::crypto::constant_time_equal;
use crate::enrollment::billing::{apply_payment_webhook, run_billing_sweep, WebhookOutcome};

use super::to_api_error;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub successful: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub received: bool,
    pub outcome: WebhookOutcome,
}

/// Run the recurring-charge sweep. The scheduler authenticates with
/// `Authorization: Bearer <sweep secret>`; the comparison is constant
/// time, and an unconfigured secret rejects every caller.
pub async fn handle_billing_sweep(
    ctx: Arc<AuthContext>,
    authorization_header: Option<&str>,
) -> Result<SweepResponse, ApiError> {
    let expected = ctx.options.billing.sweep_secret.as_str();
    let presented = authorization_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or("");

    if expected.is_empty() || !constant_time_equal(expected.as_bytes(), presented.as_bytes()) {
        return Err(ApiError::unauthorized(ErrorCode::Unauthorized));
    }

    let outcome = run_billing_sweep(&ctx, Utc::now())
        .await
        .map_err(to_api_error)?;

    Ok(SweepResponse {
        successful: outcome.successful,
        failed: outcome.failed,
        errors: outcome.errors,
    })
}

/// Accept a payment provider webhook delivery. The raw payload must be
/// passed through unparsed: the signature covers the exact bytes sent.
pub async fn handle_payment_webhook(
    ctx: Arc<AuthContext>,
    payload: &str,
    signature_header: Option<&str>,
) -> Result<WebhookResponse, ApiError> {
    let signature = signature_header
        .ok_or_else(|| ApiError::unauthorized(ErrorCode::InvalidWebhookSignature))?;

    let outcome = apply_payment_webhook(&ctx, payload, signature, Utc::now())
        .await
        .map_err(to_api_error)?;

    Ok(WebhookResponse {
        received: true,
        outcome,
    })
}
