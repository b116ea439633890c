//! Export command implementation.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, ValueHint};
use serde::Serialize;

use authwatch_audit_service::{AuditService, ExportConfig, ExportFormat};
use authwatch_common_core::TimeRange;

use crate::args::parse_timestamp;
use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{key_value, print_output, FormattedOutput};

/// Export events and alerts to a file
#[derive(Debug, Parser)]
pub struct ExportCommand {
    /// Output file (defaults to authwatch-export-<timestamp>.<ext>)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// File format: json (one document) or jsonl (one record per line)
    #[arg(short, long, default_value = "json")]
    pub format: ExportFormat,

    /// Compress the file with gzip
    #[arg(long)]
    pub gzip: bool,

    /// Only include records at or after this time
    #[arg(long, value_parser = parse_timestamp)]
    pub from: Option<DateTime<Utc>>,

    /// Only include records at or before this time
    #[arg(long, value_parser = parse_timestamp)]
    pub to: Option<DateTime<Utc>>,
}

impl ExportCommand {
    pub async fn execute(&self, ctx: &CommandContext, service: &AuditService) -> Result<(), CliError> {
        let range = self.range()?;
        let config = ExportConfig::new(self.format).compressed(self.gzip);
        let path = self.output.clone().unwrap_or_else(|| self.default_path(Utc::now()));

        let document = service.export_audit_log_to_file(range, &path, &config).await?;

        print_output(
            ctx,
            &ExportReport {
                path,
                export_id: document.export_id.to_string(),
                format: self.format,
                compressed: self.gzip,
                range: document.range,
                total_events: document.total_events,
                total_alerts: document.total_alerts,
            },
        )
    }

    fn range(&self) -> Result<TimeRange, CliError> {
        let range = TimeRange {
            from: self.from,
            to: self.to,
        };
        if range.is_empty() {
            return Err(CliError::validation("--from must not be after --to", Some("from")));
        }
        Ok(range)
    }

    fn default_path(&self, now: DateTime<Utc>) -> PathBuf {
        let mut name = format!("authwatch-export-{}.{}", now.format("%Y%m%d-%H%M%S"), self.format.extension());
        if self.gzip {
            name.push_str(".gz");
        }
        PathBuf::from(name)
    }
}

#[derive(Debug, Serialize)]
struct ExportReport {
    path: PathBuf,
    export_id: String,
    format: ExportFormat,
    compressed: bool,
    range: TimeRange,
    total_events: u64,
    total_alerts: u64,
}

impl FormattedOutput for ExportReport {
    fn format_text(&self, _color: bool) -> String {
        [
            format!("Exported audit log to {}", self.path.display()),
            key_value("Export id:", &self.export_id),
            key_value("Range:", self.range),
            key_value("Events:", self.total_events),
            key_value("Alerts:", self.total_alerts),
        ]
        .join("\n")
    }
}
