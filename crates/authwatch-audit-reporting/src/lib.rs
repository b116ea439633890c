//! Reporting over the audit trail.
//!
//! Summaries of a trailing window and per-user activity listings, computed
//! directly from the event and alert stores.

mod activity;
mod summary;

pub use authwatch_database::PrincipalFailures;
pub use summary::Summary;

use authwatch_common_config::ReportingConfig;
use authwatch_database::{AlertStore, EventStore};
use std::sync::Arc;

/// Read-only reporting over the event and alert stores.
#[derive(Clone)]
pub struct AuditReporter {
    events: Arc<dyn EventStore>,
    alerts: Arc<dyn AlertStore>,
    config: ReportingConfig,
}

impl AuditReporter {
    pub fn new(events: Arc<dyn EventStore>, alerts: Arc<dyn AlertStore>, config: ReportingConfig) -> Self {
        Self { events, alerts, config }
    }

    pub fn config(&self) -> &ReportingConfig {
        &self.config
    }
}
