// Shared harness for the integration tests: an in-memory platform with
// a capturing mailer and a scriptable payment gateway.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vcorp_auth::context::AuthContext;
use vcorp_auth::mailer::{EmailMessage, Mailer};
use vcorp_auth::payments::{ChargeReceipt, ChargeRequest, PaymentGateway};
use vcorp_core::error::VcorpError;
use vcorp_core::options::VcorpOptions;
use vcorp_memory::MemoryAdapter;

pub const SWEEP_SECRET: &str = "cron-secret-for-tests";
pub const WEBHOOK_SECRET: &str = "whsec_integration_test";

/// Mailer that captures every outbound message.
#[derive(Debug, Default)]
pub struct CapturingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl CapturingMailer {
    pub fn last(&self) -> Option<EmailMessage> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), VcorpError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Gateway that records charges and can be told to decline a customer.
#[derive(Debug, Default)]
pub struct TestGateway {
    pub charges: Mutex<Vec<ChargeRequest>>,
    pub declined_customers: Mutex<Vec<String>>,
    counter: AtomicU64,
}

impl TestGateway {
    pub fn decline(&self, customer_id: &str) {
        self.declined_customers
            .lock()
            .unwrap()
            .push(customer_id.to_string());
    }

    pub fn charge_count(&self) -> usize {
        self.charges.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for TestGateway {
    async fn create_customer(&self, _email: &str, _name: &str) -> Result<String, VcorpError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("cus_test_{n}"))
    }

    async fn charge(&self, request: ChargeRequest) -> Result<ChargeReceipt, VcorpError> {
        if self
            .declined_customers
            .lock()
            .unwrap()
            .contains(&request.customer_id)
        {
            return Err(VcorpError::Other("card declined".into()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let receipt = ChargeReceipt {
            payment_id: format!("pi_test_{n}"),
            amount_cents: request.amount_cents,
        };
        self.charges.lock().unwrap().push(request);
        Ok(receipt)
    }
}

/// The assembled in-memory platform.
pub struct TestPlatform {
    pub ctx: Arc<AuthContext>,
    pub adapter: Arc<MemoryAdapter>,
    pub mailer: Arc<CapturingMailer>,
    pub gateway: Arc<TestGateway>,
}

pub fn platform() -> TestPlatform {
    let mut options = VcorpOptions::new("an-integration-test-secret-0123456789")
        .base_url("http://localhost:3001")
        .sweep_secret(SWEEP_SECRET)
        .webhook_secret(WEBHOOK_SECRET);
    options.logger_config.disabled = true;

    let adapter = Arc::new(MemoryAdapter::new());
    let mailer = Arc::new(CapturingMailer::default());
    let gateway = Arc::new(TestGateway::default());

    let ctx = AuthContext::new(
        options,
        adapter.clone(),
        mailer.clone(),
        gateway.clone(),
    );

    TestPlatform {
        ctx,
        adapter,
        mailer,
        gateway,
    }
}

/// Pull the magic-link token out of a captured sign-in email.
pub fn token_from_email(message: &EmailMessage) -> String {
    let start = message
        .html
        .find("token=")
        .expect("email contains a token")
        + "token=".len();
    message.html[start..start + 64].to_string()
}

/// Pull the 6-digit PIN out of a captured PIN email.
pub fn pin_from_email(message: &EmailMessage) -> String {
    let start = message.html.find("<strong>").expect("email contains a PIN") + "<strong>".len();
    let end = message.html[start..].find("</strong>").unwrap() + start;
    message.html[start..end].to_string()
}
