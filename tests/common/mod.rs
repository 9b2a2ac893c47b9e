//! Test utilities and telemetry harness for otel-demo tests.
//!
//! Provides:
//! - In-memory span and metric exporters wired into a [`Telemetry`] handle
//! - A capturing `tracing` layer for asserting on log records
//! - The application router over that handle

#![allow(dead_code)]

use axum::Router;
use opentelemetry::KeyValue;
use opentelemetry_sdk::export::trace::SpanData;
use opentelemetry_sdk::metrics::data::{Aggregation, Histogram, ResourceMetrics, Sum};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::runtime;
use opentelemetry_sdk::testing::metrics::InMemoryMetricsExporter;
use opentelemetry_sdk::testing::trace::{InMemorySpanExporter, InMemorySpanExporterBuilder};
use opentelemetry_sdk::trace::TracerProvider;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::Layer;

use otel_demo::observability::Telemetry;
use otel_demo::server::router;
use otel_demo::service::{AppState, ServiceIdentity};

/// Service name used by every harness.
pub const SERVICE_NAME: &str = "python-service";

/// One captured `tracing` event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn message(&self) -> Option<&str> {
        self.field("message")
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Shared sink the capturing layer writes into.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedLogs {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().expect("log sink poisoned").clone()
    }

    /// Events whose message equals `message`.
    pub fn with_message(&self, message: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.message() == Some(message))
            .collect()
    }
}

struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let mut fields = BTreeMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        let captured = CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields,
        };
        self.0.lock().expect("log sink poisoned").push(captured);
    }
}

/// Telemetry handle backed by in-memory exporters.
///
/// Must be created inside a Tokio runtime. Tests that read metrics need the
/// multi-threaded flavor: flushing the periodic reader blocks the caller
/// until the reader task has exported.
///
/// Log capture is installed as the thread-local default subscriber, so only
/// events emitted on the test's own thread are captured.
pub struct TestTelemetry {
    pub telemetry: Arc<Telemetry>,
    pub logs: CapturedLogs,
    spans: InMemorySpanExporter,
    metrics: InMemoryMetricsExporter,
    tracer_provider: TracerProvider,
    meter_provider: SdkMeterProvider,
    _subscriber: DefaultGuard,
}

impl TestTelemetry {
    pub fn new() -> Self {
        let spans = InMemorySpanExporterBuilder::new().build();
        let tracer_provider = TracerProvider::builder()
            .with_simple_exporter(spans.clone())
            .build();

        let metrics = InMemoryMetricsExporter::default();
        let reader = PeriodicReader::builder(metrics.clone(), runtime::Tokio).build();
        let meter_provider = SdkMeterProvider::builder().with_reader(reader).build();

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::registry().with(logs.clone());
        let _subscriber = tracing::subscriber::set_default(subscriber);

        Self {
            telemetry: Arc::new(Telemetry::new(&tracer_provider, &meter_provider)),
            logs,
            spans,
            metrics,
            tracer_provider,
            meter_provider,
            _subscriber,
        }
    }

    /// Router serving the application over this handle.
    pub fn app(&self) -> Router {
        router(AppState::new(
            self.telemetry.clone(),
            ServiceIdentity::from_service_name(SERVICE_NAME),
        ))
    }

    /// All spans ended so far, in end order.
    pub fn finished_spans(&self) -> Vec<SpanData> {
        self.spans.get_finished_spans().expect("finished spans")
    }

    /// The only finished span named `name`.
    pub fn span_named(&self, name: &str) -> SpanData {
        let mut matching: Vec<_> = self
            .finished_spans()
            .into_iter()
            .filter(|span| span.name == name)
            .collect();
        assert_eq!(matching.len(), 1, "expected exactly one span named {name}");
        matching.remove(0)
    }

    /// Flush the meter provider and return the latest cumulative export.
    pub fn collect_metrics(&self) -> MetricsSnapshot {
        self.meter_provider.force_flush().expect("flush metrics");
        let mut exported = self.metrics.get_finished_metrics().expect("exported metrics");
        MetricsSnapshot(exported.pop().expect("at least one metrics export"))
    }
}

impl Default for TestTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// One export of the request instruments.
pub struct MetricsSnapshot(ResourceMetrics);

impl MetricsSnapshot {
    fn metric_data(&self, name: &str) -> Option<&dyn Aggregation> {
        self.0
            .scope_metrics
            .iter()
            .flat_map(|scope| scope.metrics.iter())
            .find(|metric| metric.name == name)
            .map(|metric| metric.data.as_ref())
    }

    /// Counter value for the data point whose attributes are exactly `labels`.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        let sum = self
            .metric_data(name)?
            .as_any()
            .downcast_ref::<Sum<u64>>()?;
        sum.data_points
            .iter()
            .find(|point| labels_match(&point.attributes, labels))
            .map(|point| point.value)
    }

    /// Histogram observation count for the data point whose attributes are exactly `labels`.
    pub fn histogram_count(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        let histogram = self
            .metric_data(name)?
            .as_any()
            .downcast_ref::<Histogram<f64>>()?;
        histogram
            .data_points
            .iter()
            .find(|point| labels_match(&point.attributes, labels))
            .map(|point| point.count)
    }
}

fn labels_match(attributes: &[KeyValue], labels: &[(&str, &str)]) -> bool {
    attributes.len() == labels.len()
        && labels.iter().all(|(key, value)| {
            attributes
                .iter()
                .any(|kv| kv.key.as_str() == *key && kv.value.as_str() == *value)
        })
}

/// String value of a span attribute.
pub fn span_attribute(span: &SpanData, key: &str) -> Option<String> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.as_str().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_is_exact() {
        let attributes = vec![KeyValue::new("method", "GET"), KeyValue::new("endpoint", "/")];
        assert!(labels_match(&attributes, &[("method", "GET"), ("endpoint", "/")]));
        assert!(!labels_match(&attributes, &[("method", "GET")]));
        assert!(!labels_match(
            &attributes,
            &[("method", "GET"), ("endpoint", "/"), ("status", "error")]
        ));
    }
}
