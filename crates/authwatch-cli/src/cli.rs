//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{ArgAction, ColorChoice, Parser, Subcommand, ValueHint};

use authwatch_audit_service::AuditService;
use authwatch_common_config::{AuthwatchConfig, ConfigLoader};

use crate::commands::{
    ActivityCommand, AlertsCommand, ExportCommand, RecordCommand, ResolveCommand, SummaryCommand,
};
use crate::error::CliError;

/// authwatch - authentication audit trail viewer
///
/// Inspect recorded authentication events, security alerts and exports.
#[derive(Debug, Parser)]
#[command(
    name = "authwatch",
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all logging except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "AUTHWATCH_CONFIG",
        value_hint = ValueHint::FilePath
    )]
    pub config: Option<PathBuf>,

    /// Audit database path (overrides the configuration file)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto", value_enum)]
    pub color: ColorChoice,

    /// Output format
    #[arg(id = "output_format", long = "output-format", global = true, default_value = "text", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Event and alert totals for a trailing window
    Summary(SummaryCommand),

    /// List unresolved security alerts
    Alerts(AlertsCommand),

    /// Recent events for one principal
    Activity(ActivityCommand),

    /// Export events and alerts to a file
    Export(ExportCommand),

    /// Mark an alert resolved
    Resolve(ResolveCommand),

    /// Record an authentication event
    Record(RecordCommand),
}

impl Cli {
    /// Load configuration from file or default locations
    pub fn load_config(&self) -> Result<AuthwatchConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::default().load_file(path)?,
            None => ConfigLoader::default().load()?,
        };
        if let Some(db) = &self.db {
            config.database.path = db.clone();
        }
        Ok(config)
    }

    /// Execute the selected command
    pub async fn execute(self, config: AuthwatchConfig) -> Result<(), CliError> {
        let service = AuditService::open(config.clone()).await?;
        service.health_check().await?;
        let ctx = CommandContext {
            config,
            format: self.format,
            color: crate::output::use_color(self.color) && self.format == OutputFormat::Text,
        };

        let result = match self.command {
            Command::Summary(cmd) => cmd.execute(&ctx, &service).await,
            Command::Alerts(cmd) => cmd.execute(&ctx, &service).await,
            Command::Activity(cmd) => cmd.execute(&ctx, &service).await,
            Command::Export(cmd) => cmd.execute(&ctx, &service).await,
            Command::Resolve(cmd) => cmd.execute(&ctx, &service).await,
            Command::Record(cmd) => cmd.execute(&ctx, &service).await,
        };
        service.close().await;
        result
    }
}

/// Context passed to all commands
#[derive(Debug)]
pub struct CommandContext {
    pub config: AuthwatchConfig,
    pub format: OutputFormat,
    pub color: bool,
}
