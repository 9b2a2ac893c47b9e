//! OpenTelemetry observability infrastructure.
//!
//! Provides:
//! - Process-wide tracer, meter and logger providers sharing one [`Resource`]
//! - The request telemetry wrapper ([`Telemetry::run_traced`])
//! - Log correlation with the active span ([`log_correlated!`](crate::log_correlated))
//! - W3C trace context extraction for inbound requests
//!
//! Providers are built once at startup and injected into handlers through
//! [`Telemetry`]; nothing here installs global providers.

pub mod correlate;
pub mod metrics;
pub mod propagation;
pub mod traced;
pub mod tracing;

use opentelemetry::metrics::MeterProvider as _;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::LoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{self as sdktrace, RandomIdGenerator, Sampler, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use opentelemetry_semantic_conventions as semconv;

use crate::config::Config;
use self::metrics::RequestMetrics;

/// Instrumentation scope name for the tracer and meter.
pub const INSTRUMENTATION_NAME: &str = env!("CARGO_PKG_NAME");

/// Errors raised while building the telemetry pipelines.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to build span exporter: {0}")]
    Trace(#[from] opentelemetry::trace::TraceError),

    #[error("failed to build metrics pipeline: {0}")]
    Metrics(#[from] opentelemetry::metrics::MetricsError),

    #[error("failed to build log exporter: {0}")]
    Logs(#[from] opentelemetry::logs::LogError),
}

/// Build the resource attached to every span, metric and log record.
pub fn service_resource(service_name: &str, service_version: &str) -> Resource {
    Resource::new(vec![
        KeyValue::new(semconv::resource::SERVICE_NAME, service_name.to_string()),
        KeyValue::new(semconv::resource::SERVICE_VERSION, service_version.to_string()),
    ])
}

/// Per-request telemetry handle shared by all handlers.
///
/// Holds the tracer used for request and nested spans plus the request
/// instruments. Cheap to clone; usually shared as `Arc<Telemetry>`.
#[derive(Debug, Clone)]
pub struct Telemetry {
    tracer: sdktrace::Tracer,
    metrics: RequestMetrics,
}

impl Telemetry {
    /// Create the handle from already-built providers.
    pub fn new(tracer_provider: &TracerProvider, meter_provider: &SdkMeterProvider) -> Self {
        let meter = meter_provider.meter(INSTRUMENTATION_NAME);
        Self {
            tracer: tracer_provider.tracer(INSTRUMENTATION_NAME),
            metrics: RequestMetrics::new(&meter),
        }
    }

    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }
}

/// Owner of the SDK providers for the lifetime of the process.
///
/// Dropping this without calling [`TelemetryProviders::shutdown`] may lose the
/// last export batch.
#[derive(Debug)]
pub struct TelemetryProviders {
    tracer_provider: TracerProvider,
    meter_provider: SdkMeterProvider,
    logger_provider: Option<LoggerProvider>,
}

impl TelemetryProviders {
    /// Build all three pipelines from configuration.
    ///
    /// With `otel_disabled` the providers are created without exporters:
    /// span ids are still generated so log correlation keeps working, and
    /// metrics are kept in a manual reader.
    pub fn init(config: &Config) -> Result<Self, TelemetryError> {
        let resource = service_resource(&config.service_name, &config.service_version);

        let trace_config = sdktrace::Config::default()
            .with_sampler(Sampler::AlwaysOn)
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(resource.clone());

        if config.otel_disabled {
            return Ok(Self {
                tracer_provider: TracerProvider::builder().with_config(trace_config).build(),
                meter_provider: metrics::build_meter_provider(None, resource)?,
                logger_provider: None,
            });
        }

        let span_exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(config.otel_endpoint.clone())
            .with_timeout(config.export_timeout())
            .build_span_exporter()?;
        let tracer_provider = TracerProvider::builder()
            .with_batch_exporter(span_exporter, runtime::Tokio)
            .with_config(trace_config)
            .build();

        let meter_provider = metrics::build_meter_provider(Some(config), resource.clone())?;

        let log_exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(config.otel_endpoint.clone())
            .with_timeout(config.export_timeout())
            .build_log_exporter()?;
        let logger_provider = LoggerProvider::builder()
            .with_batch_exporter(log_exporter, runtime::Tokio)
            .with_resource(resource)
            .build();

        Ok(Self {
            tracer_provider,
            meter_provider,
            logger_provider: Some(logger_provider),
        })
    }

    /// Handle for the request path.
    pub fn telemetry(&self) -> Telemetry {
        Telemetry::new(&self.tracer_provider, &self.meter_provider)
    }

    /// Logger provider backing the `tracing` log bridge, if export is enabled.
    pub fn logger_provider(&self) -> Option<&LoggerProvider> {
        self.logger_provider.as_ref()
    }

    /// Flush pending batches and stop the background exporters.
    ///
    /// Failures are logged, never returned: telemetry must not turn a clean
    /// shutdown into an error exit.
    pub fn shutdown(self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            ::tracing::warn!(error = %e, "Failed to shut down tracer provider");
        }
        if let Err(e) = self.meter_provider.shutdown() {
            ::tracing::warn!(error = %e, "Failed to shut down meter provider");
        }
        if let Some(logger_provider) = self.logger_provider {
            if let Err(e) = logger_provider.shutdown() {
                // The bridge is gone at this point; stderr is the only sink left.
                eprintln!("failed to shut down logger provider: {e}");
            }
        }
    }
}
