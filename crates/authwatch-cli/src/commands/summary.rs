//! Summary command implementation.

use chrono::Duration;
use clap::Parser;
use serde::Serialize;

use authwatch_audit_service::{AuditService, Summary};

use crate::args::parse_hours;
use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{failure_paint, key_value, paint, print_output, section, severity_paint, FormattedOutput};

/// Event and alert totals for a trailing window
#[derive(Debug, Parser)]
pub struct SummaryCommand {
    /// Window length in hours (defaults to reporting.default_summary_hours)
    #[arg(long, value_parser = parse_hours)]
    pub hours: Option<u32>,
}

impl SummaryCommand {
    pub async fn execute(&self, ctx: &CommandContext, service: &AuditService) -> Result<(), CliError> {
        let duration = self.hours.map(|h| Duration::hours(i64::from(h)));
        let summary = service.get_summary(duration).await?;
        print_output(ctx, &SummaryView(summary))
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct SummaryView(Summary);

impl FormattedOutput for SummaryView {
    fn format_text(&self, color: bool) -> String {
        let s = &self.0;
        let mut lines = vec![
            section(&format!("Audit summary (last {} hours)", s.time_window_hours)),
            key_value("Total events:", s.total),
            key_value("Successful:", s.success_count),
            key_value("Failed:", paint(&s.failure_count.to_string(), failure_paint(s.failure_count), color)),
            key_value("Blocked:", s.blocked_count),
            String::new(),
            "Top failing principals".to_string(),
        ];

        if s.top_failing_principals.is_empty() {
            lines.push("  (none)".to_string());
        }
        for p in &s.top_failing_principals {
            let count = paint(&p.failures.to_string(), failure_paint(p.failures), color);
            lines.push(key_value(&p.principal, count));
        }

        lines.push(String::new());
        lines.push("Active alerts".to_string());
        for (severity, count) in s.active_alerts_by_severity.iter().rev() {
            let label = paint(&format!("{:<18}", severity.to_string()), severity_paint(*severity), color && *count > 0);
            lines.push(format!("  {label}{count}"));
        }
        lines.join("\n")
    }
}
