//! otel-demo: an HTTP service exporting traces, metrics and logs over OTLP.
//!
//! # Usage
//!
//! ```bash
//! otel-demo --port 8000 --otel-endpoint http://otel-collector:4317
//! ```
//!
//! Environment variables can also be used:
//! - `OTEL_SERVICE_NAME`: Service name in the telemetry resource
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint (OTLP/gRPC)
//! - `OTEL_SDK_DISABLED`: Disable export
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use anyhow::Context as _;
use otel_demo::config::Config;
use otel_demo::observability::tracing::{init_tracing, log_export_target};
use otel_demo::observability::TelemetryProviders;
use otel_demo::server::run_server;
use std::sync::Arc;
use tokio::sync::watch;

/// Print startup banner with version and configuration.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let export = if config.otel_disabled {
        "disabled".to_string()
    } else {
        config.otel_endpoint.clone()
    };
    eprintln!(
        r#"
  otel-demo v{}

  Configuration:
    Address:    {}:{}
    Service:    {} {}
    OTLP:       {}
    Log Level:  {}

  Press Ctrl+C to shutdown gracefully.
"#,
        version,
        config.host,
        config.port,
        config.service_name,
        config.service_version,
        export,
        config.log_level
    );
}

/// Wait for Ctrl+C. If the handler cannot be installed, never resolve:
/// dropping the shutdown sender would stop the server immediately.
async fn wait_for_ctrl_c(ctrl_c: impl std::future::Future<Output = std::io::Result<()>>) {
    match ctrl_c.await {
        Ok(()) => tracing::info!("Received Ctrl+C, initiating shutdown..."),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();
    config.validate().context("invalid configuration")?;

    // Build the telemetry pipelines, then route logs through them
    let providers =
        TelemetryProviders::init(&config).context("failed to initialize OpenTelemetry")?;
    init_tracing(&config, providers.logger_provider());
    log_export_target(&config);
    let telemetry = Arc::new(providers.telemetry());

    print_banner(&config);

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn signal handler task
    tokio::spawn(async move {
        // Wait for SIGTERM or SIGINT (Ctrl+C)
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {
                            tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                        }
                        _ = sigterm.recv() => {
                            tracing::info!("Received SIGTERM, initiating shutdown...");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler, waiting for Ctrl+C only");
                    wait_for_ctrl_c(ctrl_c).await;
                }
            }
        }

        #[cfg(not(unix))]
        wait_for_ctrl_c(ctrl_c).await;

        // Signal shutdown
        let _ = shutdown_tx.send(true);
    });

    // Run the server
    let served = run_server(config, telemetry, shutdown_rx).await;

    // Flush whatever is still queued, even if the server failed
    tracing::info!("Flushing telemetry");
    providers.shutdown();

    served?;
    eprintln!("otel-demo shutdown complete");
    Ok(())
}
