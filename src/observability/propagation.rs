//! W3C Trace Context propagation for inbound requests.
//!
//! The middleware extracts `traceparent`/`tracestate` and polls the rest of
//! the stack inside the extracted context, so request spans join the caller's
//! trace. No span is created here.

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::FutureExt;
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;

/// Read-only view of request headers for the propagator.
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

/// Extract the remote parent context from request headers.
///
/// Returns the current context unchanged when no valid `traceparent` is present.
pub fn extract_context(headers: &HeaderMap) -> Context {
    TraceContextPropagator::new().extract(&HeaderExtractor(headers))
}

/// Axum middleware running the downstream handler inside the caller's trace context.
pub async fn propagate_context(request: Request, next: Next) -> Response {
    let parent = extract_context(request.headers());
    next.run(request).with_context(parent).await
}
