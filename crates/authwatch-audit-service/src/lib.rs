//! Authentication audit trail and intrusion detection.
//!
//! [`AuditService`] wires the event and alert stores, the detection engine,
//! reporting and export into the interface offered to the rest of an
//! application: the credential layer calls [`AuditService::record_event`]
//! after every authentication step, and presentation layers read summaries,
//! alerts, activity and exports.
//!
//! ```no_run
//! # async fn demo() -> authwatch_common_core::Result<()> {
//! use authwatch_audit_service::{AuditService, EventStatus, EventType, NewAuditEvent};
//!
//! let service = AuditService::in_memory().await?;
//! let outcome = service
//!     .record_event(NewAuditEvent::new("alice", EventType::Login, EventStatus::Failure))
//!     .await?;
//! println!("risk: {}", outcome.event.risk_level);
//! # Ok(())
//! # }
//! ```

use authwatch_audit_alerting::{AlertManager, DetectionEngine, WindowAggregator};
use authwatch_audit_capture::{AuditRecorder, SecurityEventRecorder};
use authwatch_audit_export::AuditExporter;
use authwatch_audit_reporting::AuditReporter;
use authwatch_common_config::AuthwatchConfig;
use authwatch_common_core::{Result, TimeRange};
use authwatch_database::{DatabasePool, PoolConfig, SqliteAlertStore, SqliteEventStore};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

pub use authwatch_audit_capture::{LoginContext, RecordOutcome};
pub use authwatch_audit_export::{ExportConfig, ExportDocument, ExportFormat};
pub use authwatch_audit_reporting::{PrincipalFailures, Summary};
pub use authwatch_audit_types::{
    Alert, AlertId, AlertType, AuditEvent, AuditEventId, EventDetails, EventStatus, EventType, NewAuditEvent,
    RiskLevel, Severity,
};

/// The audit engine behind one database.
#[derive(Clone)]
pub struct AuditService {
    db: DatabasePool,
    config: AuthwatchConfig,
    recorder: Arc<AuditRecorder>,
    alerts: Arc<AlertManager>,
    reporter: AuditReporter,
    exporter: AuditExporter,
}

impl AuditService {
    /// Open (creating and migrating if needed) the configured database.
    pub async fn open(config: AuthwatchConfig) -> Result<Self> {
        let db = DatabasePool::open(PoolConfig::from_database_config(&config.database)).await?;
        info!(path = %config.database.path.display(), "Audit database opened");
        Ok(Self::with_pool(db, config))
    }

    /// A private in-memory instance with default settings.
    pub async fn in_memory() -> Result<Self> {
        let db = DatabasePool::open_in_memory().await?;
        Ok(Self::with_pool(db, AuthwatchConfig::default()))
    }

    /// Build on an already migrated pool.
    pub fn with_pool(db: DatabasePool, config: AuthwatchConfig) -> Self {
        let events = Arc::new(SqliteEventStore::new(&db));
        let alert_store = Arc::new(SqliteAlertStore::new(&db));

        let alerts = Arc::new(AlertManager::new(alert_store.clone(), config.detection.dedup_window()));
        let aggregator = WindowAggregator::new(events.clone(), config.detection.clone());
        let engine = Arc::new(DetectionEngine::new(aggregator, alerts.clone()));

        Self {
            recorder: Arc::new(AuditRecorder::new(events.clone(), engine)),
            reporter: AuditReporter::new(events.clone(), alert_store.clone(), config.reporting.clone()),
            exporter: AuditExporter::new(events, alert_store),
            alerts,
            db,
            config,
        }
    }

    pub fn config(&self) -> &AuthwatchConfig {
        &self.config
    }

    /// Record one authentication event and run detection on it.
    pub async fn record_event(&self, event: NewAuditEvent) -> Result<RecordOutcome> {
        self.recorder.record_event(event).await
    }

    /// String-typed variant of [`record_event`](Self::record_event).
    pub async fn record(
        &self,
        principal: &str,
        event_type: &str,
        status: &str,
        source: Option<&str>,
        details: EventDetails,
    ) -> Result<RecordOutcome> {
        self.recorder.record(principal, event_type, status, source, details).await
    }

    /// Typed recorder for login handlers.
    pub fn security_events(&self) -> SecurityEventRecorder {
        SecurityEventRecorder::new(self.recorder.clone())
    }

    /// Summary of the trailing `duration`, or of the configured default window.
    pub async fn get_summary(&self, duration: Option<Duration>) -> Result<Summary> {
        self.get_summary_as_of(Utc::now(), duration).await
    }

    pub async fn get_summary_as_of(&self, now: DateTime<Utc>, duration: Option<Duration>) -> Result<Summary> {
        let duration = duration
            .unwrap_or_else(|| Duration::hours(i64::from(self.config.reporting.default_summary_hours)));
        self.reporter.summary_as_of(now, duration).await
    }

    /// Unresolved alerts, newest first.
    pub async fn get_active_alerts(&self) -> Result<Vec<Alert>> {
        Ok(self.alerts.list_active().await?)
    }

    pub async fn get_alert(&self, id: AlertId) -> Result<Option<Alert>> {
        Ok(self.alerts.get(id).await?)
    }

    /// The principal's most recent events, newest first.
    pub async fn get_user_activity(&self, principal: &str, limit: Option<u32>) -> Result<Vec<AuditEvent>> {
        self.reporter.user_activity(principal, limit).await
    }

    /// Every event and alert in `range`.
    pub async fn export_audit_log(&self, range: TimeRange) -> Result<ExportDocument> {
        Ok(self.exporter.collect(range).await?)
    }

    /// Export `range` to a file.
    pub async fn export_audit_log_to_file(
        &self,
        range: TimeRange,
        path: impl AsRef<Path>,
        config: &ExportConfig,
    ) -> Result<ExportDocument> {
        Ok(self.exporter.export_to_file(range, path, config).await?)
    }

    /// Mark an alert resolved. Returns `false` when it was already resolved
    /// or does not exist.
    pub async fn resolve_alert(&self, id: AlertId) -> Result<bool> {
        Ok(self.alerts.resolve(id).await?)
    }

    /// Observe alerts as they are raised.
    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.alerts.subscribe()
    }

    pub async fn health_check(&self) -> Result<()> {
        self.db.health_check().await?;
        let stats = self.db.stats();
        debug!(size = stats.size, idle = stats.idle, utilization = stats.utilization(), "Database healthy");
        Ok(())
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}
