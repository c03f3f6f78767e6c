//! Policy handlers
//!
//! Role listing and assignment are public bootstrap endpoints so that a
//! fresh deployment can grant its first admin; per-principal role queries
//! are protected.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub id: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct AgentRolesQuery {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub roles: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct AgentRolesResponse {
    pub id: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignRoleResponse {
    pub status: &'static str,
    pub id: String,
    pub role: String,
}

/// List all roles with their permission sets
///
/// GET /policy/roles (public)
pub async fn list_roles(State(state): State<Arc<AppState>>) -> Json<RolesResponse> {
    Json(RolesResponse {
        roles: state.policy.list_roles(),
    })
}

/// Bind a role to a principal
///
/// POST /policy/assign-role (public bootstrap)
pub async fn assign_role(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssignRoleRequest>,
) -> Result<Json<AssignRoleResponse>, ApiError> {
    if request.id.trim().is_empty() || request.role.trim().is_empty() {
        return Err(ApiError::BadRequest("id and role are required".into()));
    }

    state.policy.assign(request.id.trim(), request.role.trim())?;
    info!(agent_id = %request.id, role = %request.role, "Role assigned");

    Ok(Json(AssignRoleResponse {
        status: "assigned",
        id: request.id.trim().to_string(),
        role: request.role.trim().to_string(),
    }))
}

/// Roles bound to one principal
///
/// GET /policy/agent-roles?id=… (protected, `agent:read`)
pub async fn agent_roles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgentRolesQuery>,
) -> Json<AgentRolesResponse> {
    let roles = state.policy.roles_of(&query.id);
    Json(AgentRolesResponse {
        id: query.id,
        roles,
    })
}
