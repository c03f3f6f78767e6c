//! Identity lifecycle handlers
//!
//! Registration is a public bootstrap endpoint; listing, verification,
//! revocation and renewal sit behind the admission pipeline.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use warden_core::Principal;

use crate::api::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub id: String,
    pub signature: String,
    pub nonce: String,
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub agents: Vec<Principal>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Register a new principal
///
/// POST /identity/register (public bootstrap)
///
/// Issues an Ed25519 keypair and challenge nonce. The private key is
/// emitted only here, and only when `RETURN_PRIVATE_KEY` is enabled.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Principal>), ApiError> {
    if request.id.trim().is_empty() {
        return Err(ApiError::BadRequest("id is required".into()));
    }

    let record = state.registry.register(request.id.trim())?;

    let response = if state.config.return_private_key {
        record
    } else {
        record.sanitized()
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// List all principals, private keys stripped
///
/// GET /identity/list (protected, `agent:read`)
pub async fn list(State(state): State<Arc<AppState>>) -> Json<ListResponse> {
    let agents = state.registry.list();
    let count = agents.len();
    Json(ListResponse { agents, count })
}

/// Queue a proof-of-possession for asynchronous verification
///
/// POST /identity/verify (protected, `agent:read`) → 202
///
/// The proof is checked by the background worker; the outcome lands in the
/// audit log and, on success, in the verified-recently cache.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    if request.id.trim().is_empty() || request.signature.is_empty() || request.nonce.is_empty() {
        return Err(ApiError::BadRequest(
            "id, signature and nonce are required".into(),
        ));
    }

    state
        .verifier
        .enqueue(request.id.trim(), request.signature, request.nonce);

    Ok((
        StatusCode::ACCEPTED,
        Json(StatusResponse {
            status: "verification_queued",
        }),
    ))
}

/// Revoke a principal; terminal
///
/// POST /identity/revoke (protected, `agent:delete`)
pub async fn revoke(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RevokeRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.registry.revoke(request.id.trim())?;
    info!(agent_id = %request.id, "Revocation accepted");
    Ok(Json(StatusResponse { status: "revoked" }))
}

/// Reissue the challenge nonce and extend the credential TTL
///
/// POST /identity/renew (protected, `agent:verify`)
pub async fn renew(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RevokeRequest>,
) -> Result<Json<Principal>, ApiError> {
    let record = state.registry.renew(request.id.trim())?;

    let response = if state.config.return_private_key {
        record
    } else {
        record.sanitized()
    };
    Ok(Json(response))
}
