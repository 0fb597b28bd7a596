// AuthContext — shared state for all route handlers.
//
// Built once at startup, wrapped in Arc, and cloned into every handler.

use std::sync::Arc;

use vcorp_core::db::Adapter;
use vcorp_core::logger::AuthLogger;
use vcorp_core::options::VcorpOptions;

use crate::mailer::Mailer;
use crate::payments::PaymentGateway;

/// Shared platform context.
pub struct AuthContext {
    /// The resolved configuration.
    pub options: VcorpOptions,
    /// The database adapter.
    pub adapter: Arc<dyn Adapter>,
    /// Transactional email delivery.
    pub mailer: Arc<dyn Mailer>,
    /// Payment provider integration.
    pub payments: Arc<dyn PaymentGateway>,
    /// The platform logger.
    pub logger: AuthLogger,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("base_url", &self.options.base_url)
            .field("adapter", &self.adapter)
            .finish()
    }
}

impl AuthContext {
    /// Build the context and wrap it for sharing across handlers.
    pub fn new(
        options: VcorpOptions,
        adapter: Arc<dyn Adapter>,
        mailer: Arc<dyn Mailer>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Arc<Self> {
        let logger = AuthLogger::new(options.logger_config.clone());
        Arc::new(Self {
            options,
            adapter,
            mailer,
            payments,
            logger,
        })
    }

    /// Whether the deployment is running against a localhost base URL.
    pub fn is_local(&self) -> bool {
        self.options
            .base_url
            .as_deref()
            .map(|u| u.contains("://localhost") || u.contains("://127.0.0.1"))
            .unwrap_or(true)
    }
}
