//! Alerts command implementation.

use clap::Parser;
use serde::Serialize;

use authwatch_audit_service::{Alert, AuditService, Severity};

use crate::cli::CommandContext;
use crate::commands::format_time;
use crate::error::CliError;
use crate::output::{paint, print_output, severity_paint, FormattedOutput};

/// List unresolved security alerts, newest first
#[derive(Debug, Parser)]
pub struct AlertsCommand {
    /// Only show alerts at or above this severity
    #[arg(long, value_parser = parse_severity)]
    pub min_severity: Option<Severity>,
}

fn parse_severity(s: &str) -> Result<Severity, String> {
    s.parse().map_err(|_| format!("Invalid severity: {s} (low, medium, high, critical)"))
}

impl AlertsCommand {
    pub async fn execute(&self, ctx: &CommandContext, service: &AuditService) -> Result<(), CliError> {
        let mut alerts = service.get_active_alerts().await?;
        if let Some(min) = self.min_severity {
            alerts.retain(|a| a.severity.meets_threshold(min));
        }
        print_output(ctx, &AlertList(alerts))
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct AlertList(Vec<Alert>);

impl FormattedOutput for AlertList {
    fn format_text(&self, color: bool) -> String {
        if self.0.is_empty() {
            return "No active alerts".to_string();
        }
        self.0
            .iter()
            .map(|a| {
                let severity = paint(&format!("{:<8}", a.severity.to_string()), severity_paint(a.severity), color);
                let principal = if a.principal.is_empty() { "-" } else { a.principal.as_str() };
                format!(
                    "#{:<5} {}  {}  {:<20} {:<16} {}",
                    a.id.get(),
                    format_time(a.created_at),
                    severity,
                    a.alert_type.to_string(),
                    principal,
                    a.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
