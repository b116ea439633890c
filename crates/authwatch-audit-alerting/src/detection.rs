use crate::aggregator::WindowAggregator;
use crate::manager::{AlertManager, RaiseOutcome};
use authwatch_audit_types::{Alert, AlertType, AuditEvent, EventType, NewAlert};
use authwatch_common_log::spans::{detector_span, instrument_future};
use authwatch_database::DbResult;
use chrono::{Duration, Timelike};
use std::sync::Arc;
use tracing::{debug, warn};

/// What detection did for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionReport {
    /// Alerts newly created.
    pub raised: Vec<Alert>,
    /// Detectors that fired but were suppressed by an active duplicate.
    pub suppressed: Vec<AlertType>,
    /// Detectors that could not be evaluated this cycle.
    pub skipped: Vec<AlertType>,
}

/// Runs the pattern detectors for a just-ingested event.
pub struct DetectionEngine {
    aggregator: WindowAggregator,
    alerts: Arc<AlertManager>,
}

impl DetectionEngine {
    pub fn new(aggregator: WindowAggregator, alerts: Arc<AlertManager>) -> Self {
        Self { aggregator, alerts }
    }

    pub fn aggregator(&self) -> &WindowAggregator {
        &self.aggregator
    }

    pub fn alerts(&self) -> &Arc<AlertManager> {
        &self.alerts
    }

    /// Evaluate every detector, in order, for the event's principal and the
    /// global scope. "Now" is the event's own timestamp.
    ///
    /// Never fails: a detector whose queries error is logged and reported
    /// as skipped. LOCKOUT events are recorded consequences of detection and
    /// do not trigger it.
    pub async fn evaluate(&self, event: &AuditEvent) -> DetectionReport {
        let mut report = DetectionReport::default();

        if event.event_type == EventType::Lockout {
            debug!(event_id = %event.id, "Lockout event, detectors not run");
            return report;
        }

        for alert_type in AlertType::evaluation_order() {
            if alert_type.is_per_principal() && event.principal.is_empty() {
                continue;
            }

            let outcome = instrument_future(self.run(alert_type, event), detector_span(alert_type.as_str())).await;
            match outcome {
                Ok(Some(RaiseOutcome::Raised(alert))) => report.raised.push(alert),
                Ok(Some(RaiseOutcome::Suppressed)) => {
                    debug!(detector = %alert_type, principal = %event.principal, "Alert suppressed");
                    report.suppressed.push(alert_type);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        detector = %alert_type,
                        event_id = %event.id,
                        principal = %event.principal,
                        error = %e,
                        "Detector failed, skipped for this event"
                    );
                    report.skipped.push(alert_type);
                }
            }
        }

        report
    }

    async fn run(&self, alert_type: AlertType, event: &AuditEvent) -> DbResult<Option<RaiseOutcome>> {
        match self.check(alert_type, event).await? {
            Some(alert) => self.alerts.raise(alert).await.map(Some),
            None => Ok(None),
        }
    }

    async fn check(&self, alert_type: AlertType, event: &AuditEvent) -> DbResult<Option<NewAlert>> {
        let config = self.aggregator.config();
        let now = event.timestamp;
        let principal = event.principal.as_str();

        let alert = match alert_type {
            AlertType::BruteForce => {
                let failures = self.aggregator.credential_failures(principal, now).await?;
                (failures >= config.brute_force_threshold).then(|| {
                    format!(
                        "Detected {failures} failed login attempts in {}",
                        describe_window(config.failure_window())
                    )
                })
            }
            AlertType::RapidFire => {
                let attempts = self.aggregator.attempts(principal, now).await?;
                (attempts >= config.rapid_fire_threshold).then(|| {
                    format!(
                        "Detected {attempts} attempts in {} - possible automated attack",
                        describe_window(config.rapid_fire_window())
                    )
                })
            }
            AlertType::UnusualTiming => {
                let failures = self.aggregator.unusual_hour_failures(principal, now).await?;
                (failures >= config.unusual_timing_threshold).then(|| {
                    let hour = now.with_timezone(&config.local_offset()).hour();
                    format!("Multiple failed attempts detected at unusual hour ({hour}:00)")
                })
            }
            AlertType::AccountEnumeration => {
                let principals = self.aggregator.single_failure_principals(now).await?.len() as u64;
                (principals >= config.enumeration_threshold).then(|| {
                    format!(
                        "Detected single failed attempts against {principals} different usernames in {} - possible account enumeration",
                        describe_window(config.enumeration_window())
                    )
                })
            }
        };

        let subject = if alert_type.is_per_principal() { principal } else { "" };
        Ok(alert.map(|description| NewAlert::new(alert_type, subject, description, now)))
    }
}

/// "15 minutes", "1 minute", "90 seconds".
fn describe_window(window: Duration) -> String {
    let secs = window.num_seconds();
    let (n, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
