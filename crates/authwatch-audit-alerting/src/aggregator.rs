use authwatch_audit_types::{EventStatus, EventType};
use authwatch_common_config::DetectionConfig;
use authwatch_database::{DbResult, EventQuery, EventStore};
use chrono::{DateTime, Duration, Timelike, Utc};
use std::sync::Arc;

/// Derives per-principal and global window counts from the event log.
///
/// Nothing is cached: every count is re-queried, so concurrent writers and
/// late-arriving events are always reflected. A window of length `w` ending
/// at `now` covers `(now - w, now + clock_skew_tolerance]`.
#[derive(Clone)]
pub struct WindowAggregator {
    events: Arc<dyn EventStore>,
    config: DetectionConfig,
}

impl WindowAggregator {
    pub fn new(events: Arc<dyn EventStore>, config: DetectionConfig) -> Self {
        Self { events, config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Bounds that fall outside the representable time range are left open.
    fn window(&self, now: DateTime<Utc>, length: Duration) -> EventQuery {
        let mut query = EventQuery::new();
        if let Some(lower) = now.checked_sub_signed(length) {
            query = query.after(lower);
        }
        if let Some(upper) = now.checked_add_signed(self.config.clock_skew_tolerance()) {
            query = query.until(upper);
        }
        query
    }

    /// LOGIN/TOTP failures for `principal` within the failure window.
    pub async fn credential_failures(&self, principal: &str, now: DateTime<Utc>) -> DbResult<u64> {
        let query = self
            .window(now, self.config.failure_window())
            .principal(principal)
            .event_types([EventType::Login, EventType::Totp])
            .statuses([EventStatus::Failure]);
        self.events.count(&query).await
    }

    /// Events of any kind and status for `principal` within the rapid-fire window.
    pub async fn attempts(&self, principal: &str, now: DateTime<Utc>) -> DbResult<u64> {
        let query = self.window(now, self.config.rapid_fire_window()).principal(principal);
        self.events.count(&query).await
    }

    /// FAILURE events for `principal` within the failure window whose local
    /// hour-of-day falls outside active hours.
    pub async fn unusual_hour_failures(&self, principal: &str, now: DateTime<Utc>) -> DbResult<u64> {
        let query = self
            .window(now, self.config.failure_window())
            .principal(principal)
            .statuses([EventStatus::Failure]);
        let offset = self.config.local_offset();

        let failures = self.events.query(&query).await?;
        Ok(failures
            .iter()
            .filter(|event| self.config.is_unusual_hour(event.timestamp.with_timezone(&offset).hour()))
            .count() as u64)
    }

    /// Non-empty principals with exactly one FAILURE within the enumeration window.
    pub async fn single_failure_principals(&self, now: DateTime<Utc>) -> DbResult<Vec<String>> {
        let query = self.window(now, self.config.enumeration_window());
        let counts = self.events.failure_counts_by_principal(&query).await?;
        Ok(counts
            .into_iter()
            .filter(|c| c.failures == 1 && !c.principal.is_empty())
            .map(|c| c.principal)
            .collect())
    }
}
