//! Observability handlers: audit trail, anomalies, behavior, rate stats

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::admission::AGENT_ID_HEADER;
use crate::analytics::Anomaly;
use crate::audit::AuditEvent;
use crate::ratelimit::BucketStats;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PrincipalFilter {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PrincipalQuery {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct AuditLogsResponse {
    pub events: Vec<AuditEvent>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct AnomaliesResponse {
    pub anomalies: Vec<Anomaly>,
    pub count: usize,
}

/// The audit trail, optionally filtered to one principal
///
/// GET /audit/logs[?id=…] (protected, `audit:read`)
pub async fn audit_logs(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<PrincipalFilter>,
) -> Json<AuditLogsResponse> {
    let events = match filter.id {
        Some(id) => state.audit.filter(&id),
        None => state.audit.snapshot(),
    };
    let count = events.len();
    Json(AuditLogsResponse { events, count })
}

/// Emitted anomalies, optionally filtered to one principal
///
/// GET /analytics/anomalies[?id=…] (protected, `audit:read`)
pub async fn anomalies(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<PrincipalFilter>,
) -> Json<AnomaliesResponse> {
    let anomalies = match filter.id {
        Some(id) => state.detector.anomalies_for(&id),
        None => state.detector.anomalies(),
    };
    let count = anomalies.len();
    Json(AnomaliesResponse { anomalies, count })
}

/// Behavior profile for one principal
///
/// GET /analytics/behavior?id=… (protected, `audit:read`)
pub async fn behavior(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PrincipalQuery>,
) -> Json<Value> {
    match state.detector.behavior(&query.id) {
        Some(profile) => Json(json!(profile)),
        None => Json(json!({ "agent_id": query.id, "status": "no_data" })),
    }
}

/// The caller's own token bucket
///
/// GET /ratelimit/stats (protected, `agent:read`)
pub async fn ratelimit_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<BucketStats> {
    // The admission pipeline guarantees the header on protected routes
    let agent_id = headers
        .get(AGENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    Json(state.limiter.stats(agent_id))
}
