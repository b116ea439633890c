//! Output formatting utilities for CLI commands.

use std::io::IsTerminal;

use serde::Serialize;

use crate::cli::{CommandContext, OutputFormat};
use crate::error::CliError;
use authwatch_audit_service::Severity;

/// Trait for types that can be formatted for output
pub trait FormattedOutput {
    fn format_text(&self, color: bool) -> String;

    fn format_json(&self) -> Result<String, serde_json::Error>
    where
        Self: Serialize,
    {
        serde_json::to_string_pretty(self)
    }
}

/// Print formatted output to stdout
pub fn print_output<T>(ctx: &CommandContext, value: &T) -> Result<(), CliError>
where
    T: FormattedOutput + Serialize,
{
    let output = match ctx.format {
        OutputFormat::Text => value.format_text(ctx.color),
        OutputFormat::Json => value
            .format_json()
            .map_err(|e| CliError::Other(anyhow::anyhow!("JSON serialization failed: {e}")))?,
    };

    println!("{output}");
    Ok(())
}

/// Whether to emit ANSI colors for the given choice.
pub fn use_color(choice: clap::ColorChoice) -> bool {
    match choice {
        clap::ColorChoice::Always => true,
        clap::ColorChoice::Never => false,
        clap::ColorChoice::Auto => std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
    }
}

/// Terminal colors used by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paint {
    Red,
    Yellow,
    Green,
    Cyan,
    Dim,
}

impl Paint {
    fn code(self) -> &'static str {
        match self {
            Self::Red => "31",
            Self::Yellow => "33",
            Self::Green => "32",
            Self::Cyan => "36",
            Self::Dim => "90",
        }
    }
}

pub fn paint(text: &str, paint: Option<Paint>, color: bool) -> String {
    match paint {
        Some(p) if color => format!("\x1b[{}m{text}\x1b[0m", p.code()),
        _ => text.to_string(),
    }
}

/// Highlight for a failure count: red from 5, yellow from 3.
pub fn failure_paint(failures: u64) -> Option<Paint> {
    match failures {
        n if n >= 5 => Some(Paint::Red),
        n if n >= 3 => Some(Paint::Yellow),
        _ => None,
    }
}

pub fn severity_paint(severity: Severity) -> Option<Paint> {
    match severity {
        Severity::Critical | Severity::High => Some(Paint::Red),
        Severity::Medium => Some(Paint::Yellow),
        Severity::Low => Some(Paint::Dim),
    }
}

/// Format a section header
pub fn section(title: &str) -> String {
    format!("{title}\n{}", "=".repeat(title.chars().count()))
}

/// Format a key-value pair
pub fn key_value(key: &str, value: impl std::fmt::Display) -> String {
    format!("  {key:<18}{value}")
}

/// Helper for success/error status outputs
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub status: String,
    pub message: String,
}

impl StatusOutput {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn unchanged(message: impl Into<String>) -> Self {
        Self {
            status: "unchanged".to_string(),
            message: message.into(),
        }
    }
}

impl FormattedOutput for StatusOutput {
    fn format_text(&self, color: bool) -> String {
        match self.status.as_str() {
            "success" => paint(&format!("✓ {}", self.message), Some(Paint::Green), color),
            _ => format!("- {}", self.message),
        }
    }
}
