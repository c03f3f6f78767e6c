//! Warden Gateway
//!
//! A zero-trust admission gateway that fronts an agent task-execution
//! backend and decides, per request, whether to admit it:
//!
//! 1. **Authenticate** the named principal against the identity registry
//! 2. **Authorize** the declared action against role-based policy
//! 3. **Meter** the request against a per-principal token bucket
//! 4. **Observe** behavior for anomalies
//! 5. **Record** the decision in an append-only audit trail
//!
//! Signature proofs are verified asynchronously by a background worker
//! feeding a short-lived positive cache, keeping cryptographic work off
//! the request path.
//!
//! ## API Endpoints
//!
//! ### Public (bootstrap)
//! - `GET /health` - Liveness check
//! - `POST /identity/register` - Register a principal, issue credentials
//! - `GET /policy/roles` - List roles and permissions
//! - `POST /policy/assign-role` - Bind a role to a principal
//!
//! ### Protected (admission pipeline)
//! - `GET /identity/list` - List principals (`agent:read`)
//! - `POST /identity/verify` - Queue a signature proof, 202 (`agent:read`)
//! - `POST /identity/revoke` - Revoke a principal (`agent:delete`)
//! - `POST /identity/renew` - Reissue nonce and TTL (`agent:verify`)
//! - `GET /policy/agent-roles?id=…` - Roles of a principal (`agent:read`)
//! - `GET /audit/logs` - Audit trail (`audit:read`)
//! - `GET /ratelimit/stats` - Caller's token bucket (`agent:read`)
//! - `GET /analytics/anomalies` - Emitted anomalies (`audit:read`)
//! - `GET /analytics/behavior?id=…` - Behavior profile (`audit:read`)
//! - `POST /backend/execute` - Run a task (`agent:write`, verify)
//! - `GET /backend/agents` - Backend agent list (`agent:read`)

pub mod admission;
pub mod analytics;
pub mod api;
pub mod audit;
pub mod backend;
pub mod config;
pub mod identity;
pub mod policy;
pub mod ratelimit;
pub mod state;
pub mod verifier;

pub use api::create_router;
pub use config::Config;
pub use state::AppState;
