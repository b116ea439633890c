//! Per-user activity listings.

use crate::AuditReporter;
use authwatch_audit_types::AuditEvent;
use authwatch_common_core::Result;
use authwatch_common_log::spans::{instrument_future, report_span};
use authwatch_database::EventQuery;

impl AuditReporter {
    /// The principal's most recent events, newest first.
    ///
    /// `None` uses the configured default limit. Unknown principals yield an
    /// empty list.
    pub async fn user_activity(&self, principal: &str, limit: Option<u32>) -> Result<Vec<AuditEvent>> {
        let limit = limit.unwrap_or(self.config.default_activity_limit);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query = EventQuery::new().principal(principal).newest_first().limit(limit);
        let events = instrument_future(self.events.query(&query), report_span("user_activity")).await?;
        Ok(events)
    }
}
