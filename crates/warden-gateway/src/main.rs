//! Warden Gateway Binary
//!
//! Runs the admission gateway HTTP server plus its background tasks: the
//! rate-limiter bucket sweeper and the signature-verification worker.

use std::env;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use warden_gateway::{create_router, ratelimit, verifier, AppState, Config};

#[tokio::main]
async fn main() {
    // Initialize logging
    let log_level = env::var("WARDEN_LOG_LEVEL")
        .unwrap_or_else(|_| "info".into())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Configuration
    let config = Config::from_env();
    let port = config.port;

    if config.tls.enabled {
        info!(
            cert = %config.tls.cert_path,
            key = %config.tls.key_path,
            "TLS termination expected in front of the gateway"
        );
    }
    if config.return_private_key {
        warn!("RETURN_PRIVATE_KEY is enabled; registration responses will carry private keys");
    }

    info!(
        port = port,
        backend = %config.backend_endpoint,
        rate_rps = config.rate_rps,
        rate_burst = config.rate_burst,
        credential_ttl_s = config.credential_ttl_s,
        "Starting Warden gateway"
    );

    // Wire components
    let state = Arc::new(AppState::from_config(config).expect("Failed to initialize components"));

    // Background tasks: bucket sweeper and verification worker
    tokio::spawn(ratelimit::run_sweeper(
        Arc::clone(&state.limiter),
        ratelimit::SWEEP_INTERVAL,
        ratelimit::MAX_IDLE,
    ));
    tokio::spawn(verifier::run_worker(Arc::clone(&state.verifier)));

    // Probe the backend once; a cold backend is not fatal
    match state.backend.health().await {
        Ok(()) => info!("Backend reachable"),
        Err(err) => warn!(error = %err, "Backend not reachable at startup"),
    }

    // Build router
    let app = create_router(Arc::clone(&state));

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    info!(addr = %addr, "Warden gateway listening");

    axum::serve(listener, app).await.expect("Server error");
}
