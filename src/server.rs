//! HTTP server setup and lifecycle.
//!
//! Configures the axum router with:
//! - The traced routes and the health probe
//! - W3C trace context extraction, HTTP access tracing, permissive CORS
//! - Graceful shutdown support

use anyhow::Context as _;
use axum::routing::get;
use axum::{middleware, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::observability::propagation::propagate_context;
use crate::observability::Telemetry;
use crate::service::{data, failure, health, root, AppState, ServiceIdentity};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root::handle_root))
        .route("/data", get(data::handle_data))
        .route("/error", get(failure::handle_error))
        .route("/health", get(health::handle_health))
        .layer(middleware::from_fn(propagate_context))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Run the HTTP server.
///
/// # Arguments
///
/// * `config` - Server configuration
/// * `telemetry` - Request telemetry handle shared by all handlers
/// * `shutdown_rx` - Receiver for shutdown signal
///
/// # Returns
///
/// Returns when the server has shut down.
pub async fn run_server(
    config: Config,
    telemetry: Arc<Telemetry>,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    serve(listener, &config, telemetry, shutdown_rx).await
}

/// Serve on an already-bound listener until shutdown is signalled.
pub async fn serve(
    listener: TcpListener,
    config: &Config,
    telemetry: Arc<Telemetry>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let identity = ServiceIdentity::from_service_name(&config.service_name);
    let app = router(AppState::new(telemetry, identity));

    tracing::info!(address = %listener.local_addr()?, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            // Wait for shutdown signal
            let _ = shutdown_rx.changed().await;
            tracing::info!("Shutdown signal received, stopping server");
        })
        .await
        .context("HTTP server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}
