// VcorpOptions — the main configuration struct.
//
// One instance is built at startup and shared read-only behind the
// platform context. Defaults match the production deployment; tests
// override individual fields through the builder methods.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::logger::LoggerConfig;
use crate::program::ProgramId;

// ─── Top-Level Options ───────────────────────────────────────────

/// Top-level configuration for the membership platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcorpOptions {
    /// Secret key for signing session JWTs (min 32 chars in production).
    pub secret: String,

    /// Base URL of the auth server (e.g., "https://api.thevacorp.com").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Session and JWT configuration.
    #[serde(default)]
    pub session: SessionOptions,

    /// Magic-link and PIN credential lifetimes.
    #[serde(default)]
    pub credentials: CredentialOptions,

    /// Session cookie configuration.
    #[serde(default)]
    pub cookie: CookieOptions,

    /// Origins allowed to receive credentialed CORS responses and
    /// redirect targets. Exact match only — no wildcards.
    #[serde(default = "default_trusted_origins")]
    pub trusted_origins: Vec<String>,

    /// Host-to-program resolution tables.
    #[serde(default)]
    pub resolution: ResolutionOptions,

    /// Billing and webhook secrets.
    #[serde(default)]
    pub billing: BillingOptions,

    /// Logger configuration.
    #[serde(skip)]
    pub logger_config: LoggerConfig,
}

impl Default for VcorpOptions {
    fn default() -> Self {
        Self {
            secret: String::new(),
            base_url: None,
            session: SessionOptions::default(),
            credentials: CredentialOptions::default(),
            cookie: CookieOptions::default(),
            trusted_origins: default_trusted_origins(),
            resolution: ResolutionOptions::default(),
            billing: BillingOptions::default(),
            logger_config: LoggerConfig::default(),
        }
    }
}

impl VcorpOptions {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn trusted_origin(mut self, origin: impl Into<String>) -> Self {
        self.trusted_origins.push(origin.into());
        self
    }

    pub fn sweep_secret(mut self, secret: impl Into<String>) -> Self {
        self.billing.sweep_secret = secret.into();
        self
    }

    pub fn webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.billing.webhook_secret = secret.into();
        self
    }
}

fn default_trusted_origins() -> Vec<String> {
    [
        "https://fyht4.com",
        "https://www.fyht4.com",
        "https://spiritof.com",
        "https://www.spiritof.com",
        "https://edynsgate.com",
        "https://www.edynsgate.com",
        "https://thevacorp.com",
        "https://www.thevacorp.com",
        "http://localhost:3000",
        "http://localhost:3001",
        "http://localhost:3002",
        "http://localhost:3003",
        "http://localhost:3004",
        "http://localhost:3005",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ─── Session Options ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    /// Session TTL in seconds (default: 604800 = 7 days).
    #[serde(default = "default_session_expires_in")]
    pub expires_in: u64,

    /// JWT issuer claim.
    #[serde(default = "default_jwt_issuer")]
    pub issuer: String,

    /// JWT audience claim.
    #[serde(default = "default_jwt_audience")]
    pub audience: String,
}

fn default_session_expires_in() -> u64 { 604_800 } // 7 days
fn default_jwt_issuer() -> String { "api.thevacorp.com".to_string() }
fn default_jwt_audience() -> String { "vcorp-network".to_string() }

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            expires_in: default_session_expires_in(),
            issuer: default_jwt_issuer(),
            audience: default_jwt_audience(),
        }
    }
}

// ─── Credential Options ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialOptions {
    /// Magic-link token validity in seconds (default: 86400 = 24 hours).
    #[serde(default = "default_magic_link_expires_in")]
    pub magic_link_expires_in: u64,

    /// Sign-in PIN validity in seconds (default: 300 = 5 minutes).
    #[serde(default = "default_pin_expires_in")]
    pub pin_expires_in: u64,
}

fn default_magic_link_expires_in() -> u64 { 86_400 }
fn default_pin_expires_in() -> u64 { 300 }

impl Default for CredentialOptions {
    fn default() -> Self {
        Self {
            magic_link_expires_in: default_magic_link_expires_in(),
            pin_expires_in: default_pin_expires_in(),
        }
    }
}

// ─── Cookie Options ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieOptions {
    /// Session cookie name (default: "vcorp_auth_token").
    #[serde(default = "default_cookie_name")]
    pub name: String,

    /// Force the Secure attribute. When unset, Secure is applied for
    /// any non-localhost base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,

    /// Cookie domain (e.g., ".thevacorp.com" for cross-subdomain).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

fn default_cookie_name() -> String { "vcorp_auth_token".to_string() }

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            secure: None,
            domain: None,
        }
    }
}

// ─── Resolution Options ──────────────────────────────────────────

/// Host-to-program resolution tables.
///
/// Localhost requests resolve by port (one dev port per program);
/// everything else resolves by registrable domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionOptions {
    /// Dev port to program, applied when the host is localhost or 127.0.0.1.
    #[serde(default = "default_port_programs")]
    pub port_programs: HashMap<u16, ProgramId>,

    /// Registrable domain to program.
    #[serde(default = "default_domain_programs")]
    pub domain_programs: HashMap<String, ProgramId>,
}

fn default_port_programs() -> HashMap<u16, ProgramId> {
    HashMap::from([
        (3001, ProgramId::SpiritOf),
        (3002, ProgramId::Fyht4),
        (3003, ProgramId::Taekwondo),
        (3004, ProgramId::EdynsGate),
        (3005, ProgramId::Homeschool),
    ])
}

fn default_domain_programs() -> HashMap<String, ProgramId> {
    HashMap::from([
        ("fyht4.com".to_string(), ProgramId::Fyht4),
        ("spiritof.com".to_string(), ProgramId::SpiritOf),
        ("edynsgate.com".to_string(), ProgramId::EdynsGate),
        ("thevacorp.com".to_string(), ProgramId::Homeschool),
    ])
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self {
            port_programs: default_port_programs(),
            domain_programs: default_domain_programs(),
        }
    }
}

// ─── Billing Options ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingOptions {
    /// Bearer secret the scheduler must present to trigger a sweep.
    #[serde(default)]
    pub sweep_secret: String,

    /// Signing secret for payment webhook verification.
    #[serde(default)]
    pub webhook_secret: String,

    /// Webhook signature tolerance in seconds (default: 300).
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance: u64,
}

fn default_webhook_tolerance() -> u64 { 300 }
