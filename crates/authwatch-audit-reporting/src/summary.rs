//! Trailing-window summaries.

use crate::AuditReporter;
use authwatch_audit_types::Severity;
use authwatch_common_core::Result;
use authwatch_common_log::spans::{instrument_future, report_span};
use authwatch_database::{EventQuery, PrincipalFailures};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Activity over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Exclusive start of the window.
    pub from: DateTime<Utc>,
    /// Inclusive end of the window.
    pub to: DateTime<Utc>,
    /// Length of the window in hours.
    pub time_window_hours: f64,
    pub total: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub blocked_count: u64,
    /// Principals with the most failures in the window, most first.
    pub top_failing_principals: Vec<PrincipalFailures>,
    /// Unresolved alerts by severity, regardless of when they were raised.
    /// Every severity is present.
    pub active_alerts_by_severity: BTreeMap<Severity, u64>,
}

impl Summary {
    pub fn active_alerts(&self) -> u64 {
        self.active_alerts_by_severity.values().sum()
    }
}

impl AuditReporter {
    /// Summarise the trailing `duration` ending now.
    pub async fn summary(&self, duration: Duration) -> Result<Summary> {
        self.summary_as_of(Utc::now(), duration).await
    }

    /// Summarise the window `(now - duration, now]`.
    pub async fn summary_as_of(&self, now: DateTime<Utc>, duration: Duration) -> Result<Summary> {
        instrument_future(self.build_summary(now, duration), report_span("summary")).await
    }

    async fn build_summary(&self, now: DateTime<Utc>, duration: Duration) -> Result<Summary> {
        let from = now - duration;
        let window = EventQuery::new().after(from).until(now);

        let counts = self.events.status_counts(&window).await?;
        let top_failing_principals = self
            .events
            .top_failing_principals(&window, self.config.top_failing_limit)
            .await?;

        let mut active_alerts_by_severity: BTreeMap<Severity, u64> =
            Severity::all().into_iter().map(|s| (s, 0)).collect();
        active_alerts_by_severity.extend(self.alerts.active_counts_by_severity().await?);

        tracing::debug!(total = counts.total, failures = counts.failure, "Summary computed");

        Ok(Summary {
            from,
            to: now,
            time_window_hours: duration.num_seconds() as f64 / 3600.0,
            total: counts.total,
            success_count: counts.success,
            failure_count: counts.failure,
            blocked_count: counts.blocked,
            top_failing_principals,
            active_alerts_by_severity,
        })
    }
}
