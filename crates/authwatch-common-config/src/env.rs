//! Environment variable handling.

use std::env;
use std::path::Path;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    // Configuration
    pub const AUTHWATCH_DB_PATH: &str = "AUTHWATCH_DB_PATH";
    pub const AUTHWATCH_ENUMERATION_THRESHOLD: &str = "AUTHWATCH_ENUMERATION_THRESHOLD";

    // Logging
    pub const AUTHWATCH_LOG_LEVEL: &str = "AUTHWATCH_LOG_LEVEL";

    // Development
    pub const AUTHWATCH_ENV: &str = "AUTHWATCH_ENV";
}

/// Environment configuration.
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Initialize environment from .env files in the current directory.
    pub fn init() -> Result<Self, EnvError> {
        Self::init_in(env::current_dir().unwrap_or_default())
    }

    /// Initialize environment from .env files in `dir`.
    ///
    /// Missing files are skipped; unreadable or malformed ones are errors.
    pub fn init_in(dir: impl AsRef<Path>) -> Result<Self, EnvError> {
        let dir = dir.as_ref();
        // Most specific first: a variable that is already set is never replaced.
        if let Ok(env) = env::var(vars::AUTHWATCH_ENV) {
            load_optional(&dir.join(format!(".env.{}", env)))?;
        }
        load_optional(&dir.join(".env.local"))?;
        load_optional(&dir.join(".env"))?;

        Ok(Self { _guard: () })
    }

    /// Get an optional string variable.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok()
    }

    /// Get an integer variable.
    pub fn get_int<T: std::str::FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        match env::var(var) {
            Ok(v) => v.trim().parse().map(Some).map_err(|_| EnvError::InvalidValue {
                var: var.to_string(),
                message: "expected integer".to_string(),
            }),
            Err(_) => Ok(None),
        }
    }
}

fn load_optional(path: &Path) -> Result<(), EnvError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}
