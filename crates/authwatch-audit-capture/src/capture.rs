//! The `record_event` ingestion pipeline.

use crate::risk::assess;
use authwatch_audit_alerting::DetectionEngine;
use authwatch_audit_types::{Alert, AlertType, AuditEvent, EventDetails, EventType, NewAuditEvent};
use authwatch_common_core::{truncate_to_micros, Result};
use authwatch_common_log::spans::{ingest_span, instrument_future, Timer};
use authwatch_database::EventStore;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, Span};

/// Everything `record_event` did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordOutcome {
    /// The event as persisted.
    pub event: AuditEvent,
    /// Alerts created by this event.
    pub alerts: Vec<Alert>,
    /// Detectors that fired but were deduplicated.
    pub suppressed: Vec<AlertType>,
    /// Detectors that failed and were skipped this cycle.
    pub skipped_detectors: Vec<AlertType>,
}

/// Durably records authentication events and runs detection on them.
#[derive(Clone)]
pub struct AuditRecorder {
    events: Arc<dyn EventStore>,
    engine: Arc<DetectionEngine>,
}

impl AuditRecorder {
    pub fn new(events: Arc<dyn EventStore>, engine: Arc<DetectionEngine>) -> Self {
        Self { events, engine }
    }

    pub fn engine(&self) -> &Arc<DetectionEngine> {
        &self.engine
    }

    /// Validate, stamp, risk-tag, append, then detect.
    ///
    /// Returns an error only when the event was rejected or could not be
    /// stored. Once the append succeeds the call succeeds; detector failures
    /// appear in `skipped_detectors`.
    pub async fn record_event(&self, event: NewAuditEvent) -> Result<RecordOutcome> {
        let span = ingest_span(&event.principal, event.event_type.as_str());
        instrument_future(self.ingest(event), span).await
    }

    /// String-typed entry point for collaborators that do not link the enums.
    ///
    /// Unknown event types or statuses are rejected before anything is written.
    pub async fn record(
        &self,
        principal: &str,
        event_type: &str,
        status: &str,
        source: Option<&str>,
        details: EventDetails,
    ) -> Result<RecordOutcome> {
        let event = NewAuditEvent::parse(principal, event_type, status)?
            .maybe_source(source)
            .details(details);
        self.record_event(event).await
    }

    async fn ingest(&self, event: NewAuditEvent) -> Result<RecordOutcome> {
        let timer = Timer::start("record_event");
        event.validate()?;

        let timestamp = truncate_to_micros(event.timestamp.unwrap_or_else(Utc::now));
        let event = event.at(timestamp);

        let streak_applies = event.event_type.is_credential_check() || event.event_type == EventType::Lockout;
        let prior_failures = if streak_applies {
            self.engine
                .aggregator()
                .credential_failures(&event.principal, timestamp)
                .await?
        } else {
            0
        };
        let risk_level = assess(&event, prior_failures);

        let event = self.events.append(event, risk_level).await?;
        Span::current().record("event_id", event.id.get());
        debug!(risk_level = %event.risk_level, prior_failures, "Event recorded");

        let report = if event.event_type == EventType::Lockout {
            Default::default()
        } else {
            self.engine.evaluate(&event).await
        };

        timer.finish();
        Ok(RecordOutcome {
            event,
            alerts: report.raised,
            suppressed: report.suppressed,
            skipped_detectors: report.skipped,
        })
    }
}
