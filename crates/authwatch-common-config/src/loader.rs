//! Configuration file loading and parsing.

use crate::env::{vars, Environment};
use crate::types::AuthwatchConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory holding the configuration file, relative to the project dir.
pub const CONFIG_DIR: &str = ".authwatch";
/// Configuration file name.
pub const CONFIG_FILE: &str = "config.yaml";

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

/// Configuration loader.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given project directory.
    pub fn new(project_dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: project_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the configuration file this loader reads.
    pub fn config_path(&self) -> PathBuf {
        self.base_path.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load configuration from `.authwatch/config.yaml`, falling back to defaults.
    ///
    /// Environment overrides are applied after the file is parsed.
    pub fn load(&self) -> Result<AuthwatchConfig, ConfigError> {
        let config_path = self.config_path();

        let mut config = if config_path.exists() {
            self.parse_file(&config_path)?
        } else {
            AuthwatchConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;
        Ok(config)
    }

    /// Load configuration from an explicit file, which must exist.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<AuthwatchConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let mut config = self.parse_file(path)?;
        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;
        Ok(config)
    }

    fn parse_file(&self, path: &Path) -> Result<AuthwatchConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let expanded = self.expand_env_vars(&contents)?;

        serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })
    }

    /// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
    fn expand_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}")
            .map_err(|e| ConfigError::invalid(e.to_string()))?;

        for cap in re.captures_iter(content) {
            let full_match = &cap[0];
            let var_name = &cap[1];
            let default = cap.get(2).map(|m| m.as_str());

            let value = match std::env::var(var_name) {
                Ok(v) => v,
                Err(_) => match default {
                    Some(d) => d.to_string(),
                    None => {
                        return Err(ConfigError::EnvVarNotFound {
                            var: var_name.to_string(),
                        })
                    }
                },
            };

            result = result.replace(full_match, &value);
        }

        Ok(result)
    }

    fn apply_env_overrides(&self, config: &mut AuthwatchConfig) -> Result<(), ConfigError> {
        if let Some(path) = Environment::get(vars::AUTHWATCH_DB_PATH) {
            config.database.path = PathBuf::from(path);
        }

        if let Some(threshold) = Environment::get_int::<u64>(vars::AUTHWATCH_ENUMERATION_THRESHOLD)
            .map_err(|e| ConfigError::invalid(e.to_string()))?
        {
            config.detection.enumeration_threshold = threshold;
        }

        if let Some(level) = Environment::get(vars::AUTHWATCH_LOG_LEVEL) {
            config.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values.
    fn validate(&self, config: &AuthwatchConfig) -> Result<(), ConfigError> {
        let detection = &config.detection;

        let non_zero = [
            ("detection.failure_window_secs", detection.failure_window_secs),
            ("detection.brute_force_threshold", detection.brute_force_threshold),
            ("detection.rapid_fire_window_secs", detection.rapid_fire_window_secs),
            ("detection.rapid_fire_threshold", detection.rapid_fire_threshold),
            ("detection.unusual_timing_threshold", detection.unusual_timing_threshold),
            ("detection.enumeration_window_secs", detection.enumeration_window_secs),
            ("detection.enumeration_threshold", detection.enumeration_threshold),
            ("detection.dedup_window_secs", detection.dedup_window_secs),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::invalid(format!("{name} must be greater than 0")));
            }
        }

        if detection.active_hours_end > 24 || detection.active_hours_start >= detection.active_hours_end {
            return Err(ConfigError::invalid(
                "detection.active_hours_start must be before detection.active_hours_end (0-24)",
            ));
        }

        if detection.utc_offset_minutes.abs() > 14 * 60 {
            return Err(ConfigError::invalid(
                "detection.utc_offset_minutes must be within +/- 14 hours",
            ));
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::invalid("database.max_connections must be at least 1"));
        }

        if config.database.operation_timeout_ms == 0 {
            return Err(ConfigError::invalid("database.operation_timeout_ms must be greater than 0"));
        }

        if config.reporting.top_failing_limit == 0 {
            return Err(ConfigError::invalid("reporting.top_failing_limit must be greater than 0"));
        }

        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, config: &AuthwatchConfig) -> Result<(), ConfigError> {
        let config_dir = self.base_path.join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir)?;

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(config_dir.join(CONFIG_FILE), yaml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}
