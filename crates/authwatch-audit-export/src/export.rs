//! Audit export functionality.

use authwatch_audit_types::{Alert, AuditEvent};
use authwatch_common_core::TimeRange;
use authwatch_database::DbError;
use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;
use uuid::Uuid;

/// Export format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum ExportFormat {
    /// One pretty-printed JSON document.
    #[default]
    #[serde(rename = "json")]
    #[strum(serialize = "json", ascii_case_insensitive)]
    JsonPretty,
    /// JSON Lines: a header line, then one record per line.
    #[serde(rename = "jsonl")]
    #[strum(serialize = "jsonl", ascii_case_insensitive)]
    JsonLines,
}

impl ExportFormat {
    /// Conventional file extension, without compression suffix.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::JsonPretty => "json",
            Self::JsonLines => "jsonl",
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output format.
    pub format: ExportFormat,
    /// Compress output with gzip.
    #[serde(default)]
    pub compress: bool,
}

impl ExportConfig {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            compress: false,
        }
    }

    pub fn compressed(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Everything describing an export except its records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportHeader {
    pub export_id: Uuid,
    pub exported_at: DateTime<Utc>,
    pub range: TimeRange,
    pub total_events: u64,
    pub total_alerts: u64,
}

/// A complete dump of the audit trail for a time range.
///
/// Events and alerts keep the exact field layout of [`AuditEvent`] and
/// [`Alert`], so the document deserializes back into the same values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub export_id: Uuid,
    pub exported_at: DateTime<Utc>,
    pub range: TimeRange,
    pub total_events: u64,
    pub total_alerts: u64,
    pub events: Vec<AuditEvent>,
    pub alerts: Vec<Alert>,
}

impl ExportDocument {
    pub fn new(range: TimeRange, events: Vec<AuditEvent>, alerts: Vec<Alert>) -> Self {
        Self {
            export_id: Uuid::new_v4(),
            exported_at: Utc::now(),
            range,
            total_events: events.len() as u64,
            total_alerts: alerts.len() as u64,
            events,
            alerts,
        }
    }

    pub fn header(&self) -> ExportHeader {
        ExportHeader {
            export_id: self.export_id,
            exported_at: self.exported_at,
            range: self.range,
            total_events: self.total_events,
            total_alerts: self.total_alerts,
        }
    }

    pub(crate) fn from_parts(header: ExportHeader, events: Vec<AuditEvent>, alerts: Vec<Alert>) -> Self {
        Self {
            export_id: header.export_id,
            exported_at: header.exported_at,
            range: header.range,
            total_events: header.total_events,
            total_alerts: header.total_alerts,
            events,
            alerts,
        }
    }
}

/// Export error.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
    #[error("format error: {0}")]
    Format(String),
}

impl From<ExportError> for authwatch_common_core::Error {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Io(e) => Self::Io(e),
            ExportError::Serialization(e) => Self::Serialization(e.to_string()),
            ExportError::Storage(e) => e.into(),
            ExportError::Format(msg) => Self::Validation(msg),
        }
    }
}

/// Export result.
pub type ExportResult<T> = Result<T, ExportError>;

/// Trait for export writers.
pub trait ExportWriter: Send {
    /// Write the export header.
    fn write_header(&mut self, header: &ExportHeader) -> ExportResult<()>;

    /// Write a single event.
    fn write_event(&mut self, event: &AuditEvent) -> ExportResult<()>;

    /// Write a single alert.
    fn write_alert(&mut self, alert: &Alert) -> ExportResult<()>;

    /// Write the footer, flush, and finish any compression stream.
    fn finish(&mut self) -> ExportResult<()>;

    /// Uncompressed bytes written so far.
    fn bytes_written(&self) -> u64;

    /// Write a whole document.
    fn write_document(&mut self, document: &ExportDocument) -> ExportResult<()> {
        self.write_header(&document.header())?;
        for event in &document.events {
            self.write_event(event)?;
        }
        for alert in &document.alerts {
            self.write_alert(alert)?;
        }
        self.finish()
    }
}

/// Output stream shared by the writers: optional gzip plus byte counting.
pub(crate) struct Sink<W: Write> {
    inner: SinkInner<W>,
    written: u64,
}

enum SinkInner<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> Sink<W> {
    pub(crate) fn new(writer: W, compress: bool) -> Self {
        let inner = if compress {
            SinkInner::Gzip(GzEncoder::new(writer, Compression::default()))
        } else {
            SinkInner::Plain(writer)
        };
        Self { inner, written: 0 }
    }

    pub(crate) fn written(&self) -> u64 {
        self.written
    }

    pub(crate) fn finish(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            SinkInner::Plain(w) => w.flush(),
            SinkInner::Gzip(w) => {
                w.try_finish()?;
                w.get_mut().flush()
            }
        }
    }
}

impl<W: Write> Write for Sink<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = match &mut self.inner {
            SinkInner::Plain(w) => w.write(buf)?,
            SinkInner::Gzip(w) => w.write(buf)?,
        };
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            SinkInner::Plain(w) => w.flush(),
            SinkInner::Gzip(w) => w.flush(),
        }
    }
}
