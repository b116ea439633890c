//! Record command implementation.

use clap::Parser;
use serde::Serialize;

use authwatch_audit_service::{AuditService, EventDetails, RecordOutcome};

use crate::args::parse_key_value;
use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{key_value, paint, print_output, severity_paint, FormattedOutput};

/// Record an authentication event, as the credential layer would
#[derive(Debug, Parser)]
pub struct RecordCommand {
    /// Principal (username) the event concerns
    pub principal: String,

    /// login, totp, registration or lockout
    pub event_type: String,

    /// success, failure or blocked
    pub status: String,

    /// Origin of the attempt, typically an IP address
    #[arg(long)]
    pub source: Option<String>,

    /// Extra detail as key=value (repeatable)
    #[arg(long = "detail", value_parser = parse_key_value)]
    pub details: Vec<(String, String)>,
}

impl RecordCommand {
    pub async fn execute(&self, ctx: &CommandContext, service: &AuditService) -> Result<(), CliError> {
        let details: EventDetails = self
            .details
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        let outcome = service
            .record(&self.principal, &self.event_type, &self.status, self.source.as_deref(), details)
            .await?;
        print_output(ctx, &Recorded(outcome))
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct Recorded(RecordOutcome);

impl FormattedOutput for Recorded {
    fn format_text(&self, color: bool) -> String {
        let event = &self.0.event;
        let mut lines = vec![
            format!("Recorded event #{}", event.id),
            key_value("Principal:", &event.principal),
            key_value("Event:", format!("{} {}", event.event_type, event.status)),
            key_value(
                "Risk:",
                paint(&event.risk_level.to_string(), severity_paint(event.risk_level), color),
            ),
        ];
        for alert in &self.0.alerts {
            lines.push(paint(
                &format!("  ALERT #{} {} [{}]: {}", alert.id, alert.alert_type, alert.severity, alert.description),
                severity_paint(alert.severity),
                color,
            ));
        }
        if !self.0.suppressed.is_empty() {
            let names: Vec<_> = self.0.suppressed.iter().map(|t| t.to_string()).collect();
            lines.push(format!("  suppressed (already active): {}", names.join(", ")));
        }
        if !self.0.skipped_detectors.is_empty() {
            let names: Vec<_> = self.0.skipped_detectors.iter().map(|t| t.to_string()).collect();
            lines.push(format!("  detectors skipped: {}", names.join(", ")));
        }
        lines.join("\n")
    }
}
