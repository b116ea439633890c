//! Activity command implementation.

use clap::Parser;
use serde::Serialize;

use authwatch_audit_service::{AuditEvent, AuditService, EventStatus};

use crate::cli::CommandContext;
use crate::commands::format_time;
use crate::error::CliError;
use crate::output::{paint, print_output, severity_paint, FormattedOutput, Paint};

/// Recent events for one principal, newest first
#[derive(Debug, Parser)]
pub struct ActivityCommand {
    /// Principal (username) to inspect
    pub principal: String,

    /// Maximum number of events (defaults to reporting.default_activity_limit)
    #[arg(short = 'n', long)]
    pub limit: Option<u32>,
}

impl ActivityCommand {
    pub async fn execute(&self, ctx: &CommandContext, service: &AuditService) -> Result<(), CliError> {
        let events = service.get_user_activity(&self.principal, self.limit).await?;
        print_output(
            ctx,
            &Activity {
                principal: self.principal.clone(),
                events,
            },
        )
    }
}

#[derive(Debug, Serialize)]
struct Activity {
    principal: String,
    events: Vec<AuditEvent>,
}

impl FormattedOutput for Activity {
    fn format_text(&self, color: bool) -> String {
        if self.events.is_empty() {
            return format!("No recorded activity for '{}'", self.principal);
        }

        let mut lines = vec![format!("Activity for '{}' ({} events)", self.principal, self.events.len())];
        for e in &self.events {
            let status_paint = match e.status {
                EventStatus::Success => Some(Paint::Green),
                EventStatus::Failure => Some(Paint::Yellow),
                EventStatus::Blocked => Some(Paint::Red),
            };
            lines.push(format!(
                "  {}  {:<13} {}  risk {}  {}",
                format_time(e.timestamp),
                e.event_type.to_string(),
                paint(&format!("{:<8}", e.status.to_string()), status_paint, color),
                paint(&format!("{:<8}", e.risk_level.to_string()), severity_paint(e.risk_level), color),
                e.source.as_deref().unwrap_or("-"),
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authwatch_audit_service::{AuditEventId, EventType, RiskLevel};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_empty_activity() {
        let view = Activity {
            principal: "ghost".into(),
            events: Vec::new(),
        };
        assert_eq!(view.format_text(false), "No recorded activity for 'ghost'");
    }

    #[test]
    fn test_activity_rows() {
        let event = AuditEvent::builder("alice", EventType::Totp, EventStatus::Failure)
            .source("192.0.2.1")
            .into_event(
                AuditEventId::new(4),
                Utc.with_ymd_and_hms(2024, 6, 3, 9, 15, 0).unwrap(),
                RiskLevel::Medium,
            );
        let view = Activity {
            principal: "alice".into(),
            events: vec![event],
        };

        let text = view.format_text(false);
        assert_eq!(
            text,
            "Activity for 'alice' (1 events)\n  2024-06-03 09:15:00  TOTP          FAILURE   risk MEDIUM    192.0.2.1"
        );

        let json: serde_json::Value = serde_json::from_str(&view.format_json().unwrap()).unwrap();
        assert_eq!(json["events"][0]["risk_level"], "MEDIUM");
    }
}
