//! Shared application state
//!
//! One instance wired from [`Config`] at startup and shared across every
//! handler and the admission middleware. Each component owns its tables;
//! the state struct only holds the handles.

use std::sync::Arc;

use crate::analytics::AnomalyDetector;
use crate::audit::AuditLog;
use crate::backend::{BackendBridge, BackendError};
use crate::config::Config;
use crate::identity::Registry;
use crate::policy::PolicyEngine;
use crate::ratelimit::RateLimiter;
use crate::verifier::Verifier;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub audit: Arc<AuditLog>,
    pub registry: Arc<Registry>,
    pub policy: Arc<PolicyEngine>,
    pub limiter: Arc<RateLimiter>,
    pub detector: Arc<AnomalyDetector>,
    pub verifier: Arc<Verifier>,
    pub backend: Arc<BackendBridge>,
}

impl AppState {
    /// Wire every component from configuration
    pub fn from_config(config: Config) -> Result<Self, BackendError> {
        let audit = Arc::new(AuditLog::new());
        let registry = Arc::new(Registry::new(Arc::clone(&audit), config.credential_ttl_s));
        let policy = Arc::new(PolicyEngine::new());
        let limiter = Arc::new(RateLimiter::new(config.rate_rps, config.rate_burst));
        let detector = Arc::new(AnomalyDetector::new(Arc::clone(&audit)));
        let verifier = Arc::new(Verifier::new(
            Arc::clone(&registry),
            config.verify_cache_ttl,
        ));
        let backend = Arc::new(BackendBridge::new(
            config.backend_endpoint.clone(),
            config.backend_timeout,
        )?);

        Ok(Self {
            config,
            audit,
            registry,
            policy,
            limiter,
            detector,
            verifier,
            backend,
        })
    }
}
