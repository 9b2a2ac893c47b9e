//! Request telemetry wrapper.
//!
//! [`Telemetry::run_traced`] wraps one unit of request work:
//! - opens a span parented to the current context and makes it current for the body
//! - classifies the outcome (returned `Err`, or an explicit [`mark_error`])
//! - closes the span and records the request counter and duration histogram
//!
//! Closing and recording happen in drop guards, so they run exactly once on
//! every exit path, including panics and futures dropped mid-flight.

use opentelemetry::trace::{FutureExt, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use std::borrow::Cow;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::Telemetry;

/// Span attribute flagging a failed operation.
pub const ERROR_ATTRIBUTE: &str = "error";
pub const HTTP_METHOD_ATTRIBUTE: &str = "http.method";
pub const HTTP_ROUTE_ATTRIBUTE: &str = "http.route";

/// Success/error classification of a completed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Request-scoped error flag carried in the [`Context`].
///
/// Nested spans inherit it, so `mark_error` inside a sub-operation still
/// fails the enclosing request.
#[derive(Debug, Default)]
struct ErrorFlag(AtomicBool);

/// Mark the current span as failed and flag the enclosing request's outcome as error.
///
/// This is the explicit alternative to returning `Err` from the body: the
/// handler still produces its own response, but telemetry counts it as an error.
pub fn mark_error(reason: impl Into<Cow<'static, str>>) {
    mark_error_in(&Context::current(), reason);
}

/// Like [`mark_error`] but for an explicit context.
pub fn mark_error_in(cx: &Context, reason: impl Into<Cow<'static, str>>) {
    let span = cx.span();
    span.set_attribute(KeyValue::new(ERROR_ATTRIBUTE, true));
    span.set_status(Status::error(reason));
    if let Some(flag) = cx.get::<Arc<ErrorFlag>>() {
        flag.0.store(true, Ordering::Relaxed);
    }
}

impl Telemetry {
    /// Run `body` as the traced request operation `operation`.
    ///
    /// The body's result is returned unchanged; an `Err` is recorded on the
    /// span (status and `error=true`) before being handed back.
    pub async fn run_traced<Fut, T, E>(
        &self,
        operation: impl Into<Cow<'static, str>>,
        method: &str,
        route: &str,
        body: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let started = Instant::now();
        let parent = Context::current();
        let span = self
            .tracer
            .span_builder(operation)
            .with_attributes(vec![
                KeyValue::new(HTTP_METHOD_ATTRIBUTE, method.to_string()),
                KeyValue::new(HTTP_ROUTE_ATTRIBUTE, route.to_string()),
            ])
            .start_with_context(&self.tracer, &parent);
        let cx = parent
            .with_span(span)
            .with_value(Arc::new(ErrorFlag::default()));

        let mut inflight = InFlight {
            telemetry: self,
            cx: cx.clone(),
            method,
            route,
            started,
            completed: None,
        };

        let result = body.with_context(cx).await;
        inflight.completed = Some(match &result {
            Ok(_) => Outcome::Success,
            Err(e) => {
                mark_error_in(&inflight.cx, e.to_string());
                Outcome::Error
            }
        });
        drop(inflight);
        result
    }

    /// Run `body` inside a nested span `name`, child of the current context.
    ///
    /// Records no request metrics; the span is closed on every exit path.
    pub async fn in_span<Fut>(&self, name: impl Into<Cow<'static, str>>, body: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        let parent = Context::current();
        let span = self.tracer.start_with_context(name, &parent);
        let cx = parent.with_span(span);
        let _guard = SpanGuard(cx.clone());
        body.with_context(cx).await
    }
}

/// Ends the span held by a context when dropped.
struct SpanGuard(Context);

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.0.span().end();
    }
}

/// A request operation that has started but not yet been recorded.
struct InFlight<'a> {
    telemetry: &'a Telemetry,
    cx: Context,
    method: &'a str,
    route: &'a str,
    started: Instant,
    /// `None` until the body returns; still `None` on panic or cancellation.
    completed: Option<Outcome>,
}

impl InFlight<'_> {
    fn outcome(&self) -> Outcome {
        let flagged = self
            .cx
            .get::<Arc<ErrorFlag>>()
            .is_some_and(|flag| flag.0.load(Ordering::Relaxed));
        match self.completed {
            Some(Outcome::Success) if !flagged => Outcome::Success,
            Some(_) => Outcome::Error,
            None => {
                mark_error_in(&self.cx, "operation did not complete");
                Outcome::Error
            }
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let outcome = self.outcome();
        self.cx.span().end();
        self.telemetry
            .metrics
            .record(self.method, self.route, outcome, self.started.elapsed());
    }
}
