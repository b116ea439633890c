//! Resolve command implementation.

use clap::Parser;

use authwatch_audit_service::{AlertId, AuditService};

use crate::cli::CommandContext;
use crate::error::CliError;
use crate::output::{print_output, StatusOutput};

/// Mark an alert resolved
#[derive(Debug, Parser)]
pub struct ResolveCommand {
    /// Alert id, as shown by `authwatch alerts`
    pub id: AlertId,
}

impl ResolveCommand {
    pub async fn execute(&self, ctx: &CommandContext, service: &AuditService) -> Result<(), CliError> {
        let alert = service
            .get_alert(self.id)
            .await?
            .ok_or_else(|| CliError::not_found("alert", self.id.to_string()))?;

        let status = if service.resolve_alert(self.id).await? {
            StatusOutput::success(format!("Resolved alert #{} ({} for '{}')", alert.id, alert.alert_type, alert.principal))
        } else {
            StatusOutput::unchanged(format!("Alert #{} was already resolved", alert.id))
        };
        print_output(ctx, &status)
    }
}
