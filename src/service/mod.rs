//! HTTP route handlers.
//!
//! Each traced handler runs its work through [`Telemetry::run_traced`]; the
//! health probe is deliberately left untraced.

pub mod data;
pub mod failure;
pub mod health;
pub mod root;

use std::sync::Arc;

use crate::observability::Telemetry;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub telemetry: Arc<Telemetry>,
    pub identity: Arc<ServiceIdentity>,
}

impl AppState {
    pub fn new(telemetry: Arc<Telemetry>, identity: ServiceIdentity) -> Self {
        Self {
            telemetry,
            identity: Arc::new(identity),
        }
    }
}

/// How the service names itself in response payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    /// Full telemetry service name, e.g. `python-service`.
    pub service_name: String,
    /// Short label used in payloads, e.g. `python`.
    pub label: String,
    /// Greeting returned by `GET /`.
    pub greeting: String,
}

impl ServiceIdentity {
    /// Derive the payload identity from the telemetry service name.
    ///
    /// A trailing `-service` is dropped for the label: `python-service` → `python`.
    pub fn from_service_name(service_name: &str) -> Self {
        let label = service_name
            .strip_suffix("-service")
            .filter(|s| !s.is_empty())
            .unwrap_or(service_name)
            .to_string();
        let greeting = format!("Hello from {} service!", capitalize(&label));
        Self {
            service_name: service_name.to_string(),
            label,
            greeting,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
