//! Backend proxy handlers
//!
//! Admitted requests are handed to the task-execution backend here.
//! Downstream failures surface as 5xx with the backend's message
//! preserved, and are audited as a BACKEND_ERROR detail event following
//! the request's ADMIT.

use axum::{extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::admission::AGENT_ID_HEADER;
use crate::api::error::ApiError;
use crate::audit::{EventStatus, EventType};
use crate::backend::BackendError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub task: Value,
}

/// Forward a task to the backend as the calling principal
///
/// POST /backend/execute (protected + verify, `agent:write`)
pub async fn execute(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<Value>, ApiError> {
    let agent_id = principal_from(&headers);

    match state.backend.execute(&agent_id, request.task).await {
        Ok(result) => Ok(Json(result)),
        Err(err) => Err(audit_backend_failure(&state, &agent_id, "backend_execute", err)),
    }
}

/// List the backend's agents
///
/// GET /backend/agents (protected, `agent:read`)
pub async fn agents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let agent_id = principal_from(&headers);

    match state.backend.list_agents().await {
        Ok(result) => Ok(Json(result)),
        Err(err) => Err(audit_backend_failure(&state, &agent_id, "backend_agents", err)),
    }
}

fn principal_from(headers: &HeaderMap) -> String {
    headers
        .get(AGENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn audit_backend_failure(
    state: &AppState,
    agent_id: &str,
    action: &str,
    err: BackendError,
) -> ApiError {
    warn!(agent_id = %agent_id, error = %err, "Backend call failed");
    state.audit.append(
        EventType::BackendError,
        agent_id,
        action,
        EventStatus::Failure,
        json!({ "error": err.to_string() }),
    );
    err.into()
}
