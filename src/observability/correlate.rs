//! Log correlation with the active span.
//!
//! [`log_correlated!`](crate::log_correlated) emits a `tracing` event that
//! carries `trace_id` and `span_id` of the span current in the OpenTelemetry
//! [`Context`]. Outside any span the event is emitted unchanged.

use opentelemetry::trace::TraceContextExt;
use opentelemetry::Context;

/// Hex-formatted identifiers of an active span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanIds {
    /// 32 lowercase hex characters.
    pub trace_id: String,
    /// 16 lowercase hex characters.
    pub span_id: String,
}

impl SpanIds {
    /// Ids of the span active in `cx`, if that span is valid.
    pub fn from_context(cx: &Context) -> Option<Self> {
        let span = cx.span();
        let span_context = span.span_context();
        if !span_context.is_valid() {
            return None;
        }
        Some(Self {
            trace_id: format!("{:032x}", span_context.trace_id()),
            span_id: format!("{:016x}", span_context.span_id()),
        })
    }

    /// Ids of the span active in the current context.
    pub fn current() -> Option<Self> {
        Self::from_context(&Context::current())
    }
}

/// Emit a `tracing` event at `level`, adding `trace_id`/`span_id` of the active span.
///
/// Arguments after the level are passed to [`tracing::event!`] unchanged.
///
/// ```ignore
/// log_correlated!(tracing::Level::INFO, item_count = 10, "Retrieved {} items", 10);
/// ```
#[macro_export]
macro_rules! log_correlated {
    ($level:expr, $($arg:tt)+) => {
        match $crate::observability::correlate::SpanIds::current() {
            Some(ids) => ::tracing::event!(
                $level,
                trace_id = %ids.trace_id,
                span_id = %ids.span_id,
                $($arg)+
            ),
            None => ::tracing::event!($level, $($arg)+),
        }
    };
}
