//! Audit log export for authwatch.
//!
//! An export is a faithful, complete dump of the events and alerts in a
//! time range, written as one JSON document or as JSON Lines, optionally
//! gzip-compressed.

mod export;
mod json_export;

pub use export::{ExportConfig, ExportDocument, ExportError, ExportFormat, ExportHeader, ExportResult, ExportWriter};
pub use json_export::{read_document, JsonLinesExporter, JsonPrettyExporter};

use authwatch_common_core::TimeRange;
use authwatch_common_log::spans::{instrument_future, report_span};
use authwatch_database::{AlertStore, EventQuery, EventStore};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Create an export writer for the given configuration.
pub fn create_exporter<W: Write + Send + 'static>(writer: W, config: &ExportConfig) -> Box<dyn ExportWriter> {
    match config.format {
        ExportFormat::JsonLines => Box::new(JsonLinesExporter::new(writer, config)),
        ExportFormat::JsonPretty => Box::new(JsonPrettyExporter::new(writer, config)),
    }
}

/// Collects export documents from the event and alert stores.
#[derive(Clone)]
pub struct AuditExporter {
    events: Arc<dyn EventStore>,
    alerts: Arc<dyn AlertStore>,
}

impl AuditExporter {
    pub fn new(events: Arc<dyn EventStore>, alerts: Arc<dyn AlertStore>) -> Self {
        Self { events, alerts }
    }

    /// Every event and alert in `range`, oldest first. Resolved alerts are
    /// included.
    pub async fn collect(&self, range: TimeRange) -> ExportResult<ExportDocument> {
        instrument_future(
            async {
                let events = self.events.query(&EventQuery::new().in_range(&range)).await?;
                let alerts = self.alerts.list_in_range(&range).await?;
                Ok::<_, ExportError>(ExportDocument::new(range, events, alerts))
            },
            report_span("export"),
        )
        .await
    }

    /// Collect `range` and write it to `path`, replacing any existing file.
    ///
    /// File creation and serialization run on the blocking thread pool.
    pub async fn export_to_file(
        &self,
        range: TimeRange,
        path: impl AsRef<Path>,
        config: &ExportConfig,
    ) -> ExportResult<ExportDocument> {
        let path = path.as_ref().to_path_buf();
        let document = self.collect(range).await?;

        let (document, bytes) = {
            let path = path.clone();
            let config = config.clone();
            tokio::task::spawn_blocking(move || {
                let file = BufWriter::new(File::create(&path)?);
                let mut writer = create_exporter(file, &config);
                writer.write_document(&document)?;
                Ok::<_, ExportError>((document, writer.bytes_written()))
            })
            .await
            .map_err(|e| ExportError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??
        };

        info!(
            path = %path.display(),
            format = %config.format,
            events = document.total_events,
            alerts = document.total_alerts,
            bytes,
            "Audit log exported"
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authwatch_audit_types::{AlertType, EventStatus, EventType, NewAlert, NewAuditEvent, RiskLevel};
    use authwatch_database::{DatabasePool, SqliteAlertStore, SqliteEventStore};
    use authwatch_test_utils::{at, plus_secs};
    use chrono::Duration;

    async fn seeded() -> AuditExporter {
        let db = DatabasePool::open_in_memory().await.unwrap();
        let events = Arc::new(SqliteEventStore::new(&db));
        let alerts = Arc::new(SqliteAlertStore::new(&db));

        for i in 0..4 {
            events
                .append(
                    NewAuditEvent::new("mallory", EventType::Login, EventStatus::Failure)
                        .at(plus_secs(at(8, 0, 0), i * 3600)),
                    RiskLevel::Low,
                )
                .await
                .unwrap();
        }
        let early = alerts
            .insert_unless_active(NewAlert::new(AlertType::BruteForce, "mallory", "early", at(8, 0, 0)), Duration::hours(1))
            .await
            .unwrap()
            .unwrap();
        alerts.resolve(early.id).await.unwrap();
        alerts
            .insert_unless_active(NewAlert::new(AlertType::RapidFire, "mallory", "late", at(11, 0, 0)), Duration::hours(1))
            .await
            .unwrap();

        AuditExporter::new(events, alerts)
    }

    #[tokio::test]
    async fn test_collect_range_is_complete_and_inclusive() {
        let exporter = seeded().await;

        let all = exporter.collect(TimeRange::all()).await.unwrap();
        assert_eq!(all.total_events, 4);
        assert_eq!(all.total_alerts, 2);
        assert!(all.alerts[0].resolved);

        let slice = exporter.collect(TimeRange::between(at(9, 0, 0), at(10, 0, 0))).await.unwrap();
        assert_eq!(slice.total_events, 2);
        assert_eq!(slice.total_alerts, 0);
        assert!(slice.events[0].timestamp < slice.events[1].timestamp);
    }

    #[tokio::test]
    async fn test_export_to_file_and_read_back() {
        let exporter = seeded().await;
        let dir = tempfile::tempdir().unwrap();

        for config in [
            ExportConfig::new(ExportFormat::JsonPretty),
            ExportConfig::new(ExportFormat::JsonLines).compressed(true),
        ] {
            let path = dir.path().join(format!("audit.{}", config.format.extension()));
            let written = exporter.export_to_file(TimeRange::all(), &path, &config).await.unwrap();
            let read = read_document(File::open(&path).unwrap(), &config).unwrap();
            assert_eq!(read, written);
        }
    }

    #[tokio::test]
    async fn test_export_to_missing_directory_fails() {
        let exporter = seeded().await;
        let dir = tempfile::tempdir().unwrap();
        let result = exporter
            .export_to_file(TimeRange::all(), dir.path().join("nope/audit.json"), &ExportConfig::default())
            .await;
        assert!(matches!(result, Err(ExportError::Io(_))));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_concurrent_file_exports_share_one_runtime_thread() {
        let exporter = seeded().await;
        let dir = tempfile::tempdir().unwrap();
        let pretty = ExportConfig::new(ExportFormat::JsonPretty);
        let lines = ExportConfig::new(ExportFormat::JsonLines);
        let (a, b) = (dir.path().join("a.json"), dir.path().join("b.jsonl"));

        let (first, second) = tokio::join!(
            exporter.export_to_file(TimeRange::all(), &a, &pretty),
            exporter.export_to_file(TimeRange::all(), &b, &lines),
        );
        assert_eq!(first.unwrap().total_events, 4);
        assert_eq!(read_document(File::open(&b).unwrap(), &lines).unwrap(), second.unwrap());
    }
}
