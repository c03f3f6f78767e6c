//! API error types and responses
//!
//! Component errors are mapped here to the wire contract: an HTTP status
//! plus a body of `{"error": "<reason_code>", "message": "<human>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;
use crate::identity::IdentityError;
use crate::policy::PolicyError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("X-Agent-ID header is required")]
    PrincipalRequired,

    #[error("Unknown principal: {0}")]
    UnknownPrincipal(String),

    #[error("Principal '{0}' is not active")]
    InactivePrincipal(String),

    #[error("Not authorized for: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("X-Signature header is required for this route")]
    SignatureRequired,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Role '{0}' does not exist")]
    UnknownRole(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable reason code for the error body
    pub fn reason_code(&self) -> &'static str {
        match self {
            ApiError::PrincipalRequired => "principal_required",
            ApiError::UnknownPrincipal(_) => "unknown_principal",
            ApiError::InactivePrincipal(_) => "inactive_principal",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::RateLimited => "rate_limited",
            ApiError::SignatureRequired => "signature_required",
            ApiError::BadRequest(_) => "malformed_request",
            ApiError::UnknownRole(_) => "unknown_role",
            ApiError::Duplicate(_) => "duplicate",
            ApiError::NotFound(_) => "not_found",
            ApiError::Backend(_) => "backend_error",
            ApiError::Internal(_) => "internal",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::PrincipalRequired | ApiError::UnknownPrincipal(_) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::InactivePrincipal(_) | ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::SignatureRequired
            | ApiError::BadRequest(_)
            | ApiError::UnknownRole(_) => StatusCode::BAD_REQUEST,
            ApiError::Duplicate(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Backend(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.reason_code().to_string(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Conflict(_) => ApiError::Duplicate(err.to_string()),
            IdentityError::NotFound(_) => ApiError::NotFound(err.to_string()),
            IdentityError::Inactive(id) | IdentityError::Expired(id) => {
                ApiError::InactivePrincipal(id)
            }
            IdentityError::NonceMismatch | IdentityError::BadSignature => {
                ApiError::BadRequest(err.to_string())
            }
            IdentityError::Crypto(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::UnknownRole(role) => ApiError::UnknownRole(role),
            PolicyError::Duplicate { .. } => ApiError::Duplicate(err.to_string()),
            PolicyError::NotBound { .. } => ApiError::NotFound(err.to_string()),
        }
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Client(msg) => ApiError::Internal(msg),
            other => ApiError::Backend(other.to_string()),
        }
    }
}
