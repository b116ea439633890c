//! Span helpers for the ingestion and detection paths.

use std::future::Future;
use tracing::{info_span, Instrument, Span};

/// Span covering one `record_event` call.
pub fn ingest_span(principal: &str, event_type: &str) -> Span {
    info_span!("ingest", principal = %principal, event_type = %event_type, event_id = tracing::field::Empty)
}

/// Span covering a single detector evaluation.
pub fn detector_span(detector: &str) -> Span {
    info_span!("detector", name = %detector)
}

/// Span covering a reporting or export query.
pub fn report_span(operation: &str) -> Span {
    info_span!("report", op = %operation)
}

/// Instrument a future with a span.
pub fn instrument_future<F: Future>(future: F, span: Span) -> impl Future<Output = F::Output> {
    future.instrument(span)
}

/// Timing utility for operations.
pub struct Timer {
    start: std::time::Instant,
    operation: &'static str,
}

impl Timer {
    /// Start a new timer.
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    /// Complete the timer and record duration.
    pub fn finish(self) {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.operation,
            duration_ms = %duration.as_millis(),
            "operation completed"
        );
    }
}

pub use tracing::instrument;
