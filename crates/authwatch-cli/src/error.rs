//! CLI error handling.

use std::io;
use std::process::ExitCode;

use authwatch_common_config::ConfigError;
use thiserror::Error;

/// CLI error type with context for the user.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{message}")]
    Config {
        message: String,
        #[source]
        source: Option<ConfigError>,
        hint: Option<String>,
    },

    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
        path: Option<std::path::PathBuf>,
    },

    #[error("{message}")]
    Validation { message: String, field: Option<String> },

    #[error("{message}")]
    NotFound {
        message: String,
        resource_type: String,
        resource_name: String,
    },

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn validation(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Validation {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    pub fn not_found(resource_type: &str, resource_name: impl Into<String>) -> Self {
        let resource_name = resource_name.into();
        Self::NotFound {
            message: format!("{resource_type} '{resource_name}' not found"),
            resource_type: resource_type.to_string(),
            resource_name,
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "E001",
            Self::Io { .. } => "E002",
            Self::Validation { .. } => "E004",
            Self::NotFound { .. } => "E005",
            Self::Storage(_) => "E011",
            Self::Other(_) => "E999",
        }
    }

    /// Process exit status for this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Config { .. } => 2,
            Self::Io { .. } => 3,
            Self::Validation { .. } => 5,
            Self::NotFound { .. } => 6,
            Self::Storage(_) => 11,
            Self::Other(_) => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    /// Get hint for this error if available
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Config { hint, .. } => hint.as_deref(),
            Self::Validation { field: Some(_), .. } => Some("run with --help to see accepted values"),
            Self::Storage(_) => Some("check database.path in .authwatch/config.yaml or AUTHWATCH_DB_PATH"),
            _ => None,
        }
    }

    /// Render for stderr: `error[E005]: ...` plus an optional hint line.
    pub fn render(&self, color: bool) -> String {
        let label = if color {
            format!("\x1b[31merror[{}]\x1b[0m", self.code())
        } else {
            format!("error[{}]", self.code())
        };
        match self.hint() {
            Some(hint) => format!("{label}: {self}\n  hint: {hint}"),
            None => format!("{label}: {self}"),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::NotFound { .. } => Some("pass --config with an existing file".to_string()),
            ConfigError::ParseError { .. } => Some("check the YAML syntax of the config file".to_string()),
            _ => None,
        };
        Self::Config {
            message: format!("Configuration error: {err}"),
            source: Some(err),
            hint,
        }
    }
}

impl From<authwatch_common_core::Error> for CliError {
    fn from(err: authwatch_common_core::Error) -> Self {
        use authwatch_common_core::Error;
        match err {
            Error::Validation(message) => Self::Validation { message, field: None },
            Error::NotFound(message) => Self::NotFound {
                message,
                resource_type: String::new(),
                resource_name: String::new(),
            },
            Error::Config(message) => Self::Config {
                message,
                source: None,
                hint: None,
            },
            Error::Io(source) => Self::Io {
                message: format!("I/O error: {source}"),
                source,
                path: None,
            },
            other => Self::Storage(other.to_string()),
        }
    }
}
