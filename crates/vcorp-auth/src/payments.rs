// Payment provider integration.
//
// The PaymentGateway trait covers the two calls the platform makes —
// creating a customer and charging a saved payment method — plus webhook
// signature verification for inbound payment events.

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use vcorp_core::error::VcorpError;

use crate::crypto::constant_time_equal;

type HmacSha256 = Hmac<Sha256>;

/// A request to charge a saved payment method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    pub customer_id: String,
    pub payment_method_id: String,
    /// Amount in cents.
    pub amount_cents: i64,
    pub description: String,
    /// Metadata forwarded to the provider and echoed back on webhooks.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Result of a successful charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeReceipt {
    /// The provider's payment intent / charge id.
    pub payment_id: String,
    pub amount_cents: i64,
}

/// Payment provider backend.
#[async_trait]
pub trait PaymentGateway: Send + Sync + std::fmt::Debug {
    /// Create a customer record at the provider, returning its id.
    async fn create_customer(&self, email: &str, name: &str) -> Result<String, VcorpError>;

    /// Charge a saved payment method off-session.
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeReceipt, VcorpError>;
}

// ─── Webhook Verification ────────────────────────────────────────

/// Verify a payment webhook signature header of the form
/// `t=<unix_ts>,v1=<hex hmac>`, where the signature is HMAC-SHA256 over
/// `"{t}.{payload}"`. The timestamp must be within `tolerance_secs` of now.
pub fn verify_webhook_signature(
    payload: &str,
    signature_header: &str,
    secret: &str,
    tolerance_secs: u64,
) -> Result<(), VcorpError> {
    verify_webhook_signature_at(
        payload,
        signature_header,
        secret,
        tolerance_secs,
        chrono::Utc::now().timestamp(),
    )
}

/// Timestamp-injectable form of [`verify_webhook_signature`].
pub fn verify_webhook_signature_at(
    payload: &str,
    signature_header: &str,
    secret: &str,
    tolerance_secs: u64,
    now_ts: i64,
) -> Result<(), VcorpError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<String> = Vec::new();

    for part in signature_header.split(',') {
        match part.split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => signatures.push(v.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| VcorpError::Crypto("Missing timestamp in signature header".into()))?;
    if signatures.is_empty() {
        return Err(VcorpError::Crypto("Missing v1 signature in header".into()));
    }

    if (now_ts - timestamp).unsigned_abs() > tolerance_secs {
        return Err(VcorpError::Crypto("Webhook timestamp outside tolerance".into()));
    }

    let signed_payload = format!("{timestamp}.{payload}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| VcorpError::Crypto(format!("Invalid webhook secret: {e}")))?;
    mac.update(signed_payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    for candidate in &signatures {
        if constant_time_equal(candidate.as_bytes(), expected.as_bytes()) {
            return Ok(());
        }
    }

    Err(VcorpError::Crypto("Webhook signature mismatch".into()))
}

/// Build a signature header for a payload, used by tests and local tooling.
pub fn sign_webhook_payload(payload: &str, secret: &str, timestamp: i64) -> String {
    let signed_payload = format!("{timestamp}.{payload}");
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(signed_payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={signature}")
}

#[cfg(test)]
pub mod tests_support {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// Gateway that accepts everything and returns sequential ids.
    #[derive(Debug, Default)]
    pub struct NoopGateway {
        counter: AtomicU64,
    }

    #[async_trait]
    impl PaymentGateway for NoopGateway {
        async fn create_customer(&self, _email: &str, _name: &str) -> Result<String, VcorpError> {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("cus_{n}"))
        }

        async fn charge(&self, request: ChargeRequest) -> Result<ChargeReceipt, VcorpError> {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(ChargeReceipt {
                payment_id: format!("pi_{n}"),
                amount_cents: request.amount_cents,
            })
        }
    }

    /// Gateway that records every charge and can be told to fail.
    #[derive(Debug, Default)]
    pub struct RecordingGateway {
        pub charges: Mutex<Vec<ChargeRequest>>,
        pub fail_customer_ids: Mutex<Vec<String>>,
        counter: AtomicU64,
    }

    impl RecordingGateway {
        pub fn fail_for(&self, customer_id: &str) {
            self.fail_customer_ids
                .lock()
                .unwrap()
                .push(customer_id.to_string());
        }
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn create_customer(&self, _email: &str, _name: &str) -> Result<String, VcorpError> {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("cus_{n}"))
        }

        async fn charge(&self, request: ChargeRequest) -> Result<ChargeReceipt, VcorpError> {
            if self
                .fail_customer_ids
                .lock()
                .unwrap()
                .contains(&request.customer_id)
            {
                return Err(VcorpError::Other("card declined".into()));
            }
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            let receipt = ChargeReceipt {
                payment_id: format!("pi_{n}"),
                amount_cents: request.amount_cents,
            };
            self.charges.lock().unwrap().push(request);
            Ok(receipt)
        }
    }
}
