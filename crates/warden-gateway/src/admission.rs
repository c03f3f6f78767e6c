//! Admission pipeline
//!
//! The per-request state machine every protected route passes through:
//!
//! ```text
//! EXTRACT → EXIST → STATUS → AUTHZ → RATE → (VERIFY?) → ADMIT
//! ```
//!
//! Cheap checks run first, cryptographic work last and only when the route
//! demands it. Every deny appends an audit event for the failing stage;
//! authentication and authorization denials additionally feed the anomaly
//! detector's failed-auth counter, while rate denials do not. Public
//! bootstrap routes bypass the middleware entirely.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::json;

use crate::api::error::ApiError;
use crate::audit::{EventStatus, EventType};
use crate::state::AppState;

/// Header carrying the principal identifier
pub const AGENT_ID_HEADER: &str = "X-Agent-ID";

/// Header carrying the hex detached signature over the stored nonce
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Per-route admission requirements
#[derive(Debug, Clone, Copy)]
pub struct RouteSpec {
    /// Permission the caller must hold, if any
    pub permission: Option<&'static str>,
    /// Whether the route demands a recent cryptographic proof
    pub require_verify: bool,
}

impl RouteSpec {
    /// Protected route requiring `permission`
    pub const fn permission(permission: &'static str) -> Self {
        Self {
            permission: Some(permission),
            require_verify: false,
        }
    }

    /// Protected route requiring `permission` plus proof-of-possession
    pub const fn with_verify(permission: &'static str) -> Self {
        Self {
            permission: Some(permission),
            require_verify: true,
        }
    }
}

/// The admission middleware
pub async fn admit(
    State((state, spec)): State<(Arc<AppState>, RouteSpec)>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();

    // EXTRACT
    let agent_id = request
        .headers()
        .get(AGENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .trim()
        .to_string();
    if agent_id.is_empty() {
        state.audit.append(
            EventType::AuthzDeny,
            "",
            &path,
            EventStatus::Failure,
            json!({ "reason": "principal_required" }),
        );
        return Err(ApiError::PrincipalRequired);
    }

    // EXIST
    let principal = match state.registry.get(&agent_id) {
        Ok(principal) => principal,
        Err(_) => {
            state.detector.record_failed_auth(&agent_id);
            state.audit.append(
                EventType::AuthzDeny,
                &agent_id,
                &path,
                EventStatus::Failure,
                json!({ "reason": "unknown_principal" }),
            );
            return Err(ApiError::UnknownPrincipal(agent_id));
        }
    };

    // STATUS
    let now = chrono::Utc::now().timestamp();
    if !principal.is_admissible(now) {
        state.detector.record_failed_auth(&agent_id);
        state.audit.append(
            EventType::AuthzDeny,
            &agent_id,
            &path,
            EventStatus::Failure,
            json!({
                "reason": "inactive_principal",
                "status": principal.effective_status(now).to_string(),
            }),
        );
        return Err(ApiError::InactivePrincipal(agent_id));
    }

    // AUTHZ
    if let Some(permission) = spec.permission {
        if !state.policy.can(&agent_id, permission) {
            state.detector.record_failed_auth(&agent_id);
            state.audit.append(
                EventType::AuthzDeny,
                &agent_id,
                &path,
                EventStatus::Failure,
                json!({ "reason": "forbidden", "permission": permission }),
            );
            return Err(ApiError::Forbidden(permission.to_string()));
        }
    }

    // RATE — a consumed token is never refunded
    if !state.limiter.allow(&agent_id) {
        state.audit.append(
            EventType::RateDeny,
            &agent_id,
            &path,
            EventStatus::Failure,
            json!({ "reason": "rate_limited" }),
        );
        return Err(ApiError::RateLimited);
    }

    // VERIFY — only when the route demands proof and the cache is cold
    if spec.require_verify && !state.verifier.is_recently_verified(&agent_id) {
        let signature = request
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if signature.is_empty() {
            state.audit.append(
                EventType::AuthzDeny,
                &agent_id,
                &path,
                EventStatus::Failure,
                json!({ "reason": "signature_required" }),
            );
            return Err(ApiError::SignatureRequired);
        }
        // Proof is checked asynchronously; this request is admitted and a
        // failure purges the cache before the next one can benefit from it
        state
            .verifier
            .enqueue(&agent_id, signature, principal.nonce.clone());
    }

    // ADMIT
    state.detector.record_request(&agent_id);
    state.audit.append(
        EventType::Admit,
        &agent_id,
        &path,
        EventStatus::Success,
        json!({}),
    );

    Ok(next.run(request).await)
}
