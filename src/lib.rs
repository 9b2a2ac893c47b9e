//! otel-demo: an HTTP service instrumented end to end with OpenTelemetry.
//!
//! Three routes (`/`, `/data`, `/error`) run through a request telemetry
//! wrapper that opens a span per request, correlates log lines with it, and
//! records request count and latency. Traces, metrics and logs are exported
//! over OTLP/gRPC to a collector.
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`observability`]: Providers, the telemetry wrapper, log correlation, propagation
//! - [`server`]: Router and HTTP server lifecycle
//! - [`service`]: Route handlers

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // service::health::HealthResponse is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc       // Panic docs can be verbose
)]

pub mod config;
pub mod observability;
pub mod server;
pub mod service;

/// Get the current Unix timestamp in seconds, with sub-second precision.
#[must_use]
pub fn now_secs() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}
