//! OTLP metrics for request handling.
//!
//! Key metrics:
//! - http_requests_total: Counter of completed requests by method, endpoint, status
//! - http_request_duration_seconds: Histogram of request latency by method, endpoint

use opentelemetry::metrics::{Counter, Histogram, Meter, MetricsError};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::{ManualReader, SdkMeterProvider};
use opentelemetry_sdk::{runtime, Resource};
use std::time::Duration;

use crate::config::Config;
use crate::observability::traced::Outcome;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

/// Request instruments, created once per meter.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    /// Total number of completed requests.
    pub requests_total: Counter<u64>,
    /// Histogram of request latency in seconds.
    pub request_duration: Histogram<f64>,
}

impl RequestMetrics {
    /// Create the request instruments from a meter.
    pub fn new(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter(REQUESTS_TOTAL)
                .with_description("Total number of HTTP requests")
                .with_unit("1")
                .init(),
            request_duration: meter
                .f64_histogram(REQUEST_DURATION_SECONDS)
                .with_description("HTTP request duration in seconds")
                .with_unit("s")
                .init(),
        }
    }

    /// Record one completed request: a counter increment and a duration observation.
    pub fn record(&self, method: &str, route: &str, outcome: Outcome, elapsed: Duration) {
        let labels = route_labels(method, route);
        self.requests_total.add(1, &counter_labels(&labels, outcome));
        self.request_duration.record(elapsed.as_secs_f64(), &labels);
    }
}

/// Labels shared by both request instruments.
pub fn route_labels(method: &str, route: &str) -> Vec<KeyValue> {
    vec![
        KeyValue::new("method", method.to_string()),
        KeyValue::new("endpoint", route.to_string()),
    ]
}

/// Counter labels: the route labels plus `status=error` for failed requests.
pub fn counter_labels(route_labels: &[KeyValue], outcome: Outcome) -> Vec<KeyValue> {
    let mut labels = route_labels.to_vec();
    if outcome == Outcome::Error {
        labels.push(KeyValue::new("status", outcome.as_str()));
    }
    labels
}

/// Build the meter provider.
///
/// With a config, metrics are pushed to the OTLP endpoint by a periodic
/// reader. Without one (export disabled) they are recorded into a manual
/// reader and never exported.
pub fn build_meter_provider(
    config: Option<&Config>,
    resource: Resource,
) -> Result<SdkMeterProvider, MetricsError> {
    let Some(config) = config else {
        let reader = ManualReader::builder().build();
        return Ok(SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(resource)
            .build());
    };

    use opentelemetry_otlp::{Protocol, WithExportConfig};

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(config.otel_endpoint.clone())
        .with_protocol(Protocol::Grpc)
        .with_timeout(config.export_timeout());

    let provider = opentelemetry_otlp::new_pipeline()
        .metrics(runtime::Tokio)
        .with_exporter(exporter)
        .with_period(config.metric_export_interval())
        .with_resource(resource)
        .build()?;

    Ok(provider)
}
