//! API module for the gateway

pub mod error;
pub mod handlers;

use axum::{
    extract::Request,
    middleware,
    response::Response,
    routing::{get, post, Route},
    Json, Router,
};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tower::{Layer, Service};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::admission::{self, RouteSpec};
use crate::state::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
///
/// GET /health (public)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Admission guard for one protected route
fn guard(
    state: Arc<AppState>,
    spec: RouteSpec,
) -> impl Layer<
    Route,
    Service: Service<Request, Response = Response, Error = Infallible, Future: Send>
                 + Clone
                 + Send
                 + Sync
                 + 'static,
> + Clone
       + Send
       + Sync
       + 'static {
    middleware::from_fn_with_state((state, spec), admission::admit)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration for browser-based agent consoles
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Public bootstrap endpoints
        .route("/health", get(health))
        .route("/identity/register", post(handlers::identity::register))
        .route("/policy/roles", get(handlers::policy::list_roles))
        .route("/policy/assign-role", post(handlers::policy::assign_role))
        // Identity lifecycle
        .route(
            "/identity/list",
            get(handlers::identity::list)
                .route_layer(guard(Arc::clone(&state), RouteSpec::permission("agent:read"))),
        )
        .route(
            "/identity/verify",
            post(handlers::identity::verify)
                .route_layer(guard(Arc::clone(&state), RouteSpec::permission("agent:read"))),
        )
        .route(
            "/identity/revoke",
            post(handlers::identity::revoke)
                .route_layer(guard(Arc::clone(&state), RouteSpec::permission("agent:delete"))),
        )
        .route(
            "/identity/renew",
            post(handlers::identity::renew)
                .route_layer(guard(Arc::clone(&state), RouteSpec::permission("agent:verify"))),
        )
        // Policy queries
        .route(
            "/policy/agent-roles",
            get(handlers::policy::agent_roles)
                .route_layer(guard(Arc::clone(&state), RouteSpec::permission("agent:read"))),
        )
        // Observability
        .route(
            "/audit/logs",
            get(handlers::observability::audit_logs)
                .route_layer(guard(Arc::clone(&state), RouteSpec::permission("audit:read"))),
        )
        .route(
            "/ratelimit/stats",
            get(handlers::observability::ratelimit_stats)
                .route_layer(guard(Arc::clone(&state), RouteSpec::permission("agent:read"))),
        )
        .route(
            "/analytics/anomalies",
            get(handlers::observability::anomalies)
                .route_layer(guard(Arc::clone(&state), RouteSpec::permission("audit:read"))),
        )
        .route(
            "/analytics/behavior",
            get(handlers::observability::behavior)
                .route_layer(guard(Arc::clone(&state), RouteSpec::permission("audit:read"))),
        )
        // Backend proxy
        .route(
            "/backend/execute",
            post(handlers::backend::execute)
                .route_layer(guard(Arc::clone(&state), RouteSpec::with_verify("agent:write"))),
        )
        .route(
            "/backend/agents",
            get(handlers::backend::agents)
                .route_layer(guard(Arc::clone(&state), RouteSpec::permission("agent:read"))),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
