//! Structured logging setup.
//!
//! Configures the `tracing` subscriber with:
//! - Environment-based filter (via `RUST_LOG` / `--log-level`)
//! - Console output, pretty or JSON
//! - OTLP log export through the OpenTelemetry tracing bridge

use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::LoggerProvider;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{Config, LogFormat};

/// Targets whose events never reach the log bridge.
///
/// The OTLP exporter logs through these crates itself; bridging them would
/// feed every export back into the export queue.
const EXPORTER_TARGETS: &[&str] = &[
    "h2",
    "hyper",
    "hyper_util",
    "opentelemetry",
    "opentelemetry_otlp",
    "opentelemetry_sdk",
    "tonic",
    "tower",
];

fn is_exporter_target(target: &str) -> bool {
    EXPORTER_TARGETS
        .iter()
        .any(|prefix| {
            target
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
}

/// Initialize tracing for the service.
///
/// This sets up:
/// - Console logging in the configured format
/// - The OTLP log bridge when `logger_provider` is given
///
/// # Panics
///
/// Panics if tracing has already been initialized.
pub fn init_tracing(config: &Config, logger_provider: Option<&LoggerProvider>) {
    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info,otel_demo=debug"));

    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true),
            ),
        ),
    };

    let bridge = logger_provider.map(|provider| {
        OpenTelemetryTracingBridge::new(provider)
            .with_filter(filter_fn(|metadata| !is_exporter_target(metadata.target())))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(bridge)
        .init();

    tracing::info!(
        service = %config.service_name,
        otlp_logs = logger_provider.is_some(),
        "Tracing initialized"
    );
}

/// Log where telemetry is exported.
///
/// Providers are built before the subscriber exists, so this runs from
/// startup after [`init_tracing`].
pub fn log_export_target(config: &Config) {
    if config.otel_disabled {
        tracing::info!("OTLP export disabled");
    } else {
        tracing::info!(
            endpoint = %config.otel_endpoint,
            metric_interval_ms = config.metric_export_interval_ms,
            "OTLP exporters configured"
        );
    }
}

/// Initialize tracing for tests (only logs errors).
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}
