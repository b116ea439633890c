//! Configuration types.

use chrono::{Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthwatchConfig {
    /// Audit database configuration.
    pub database: DatabaseConfig,
    /// Detection thresholds and windows.
    pub detection: DetectionConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Reporting defaults.
    pub reporting: ReportingConfig,
}

/// Audit database configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file (`:memory:` for an ephemeral store).
    pub path: PathBuf,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// Connection acquire timeout (ms).
    pub acquire_timeout_ms: u64,
    /// SQLite busy timeout for a locked database (ms).
    pub busy_timeout_ms: u64,
    /// Upper bound on any single storage operation (ms).
    pub operation_timeout_ms: u64,
    /// Enable WAL journaling.
    pub wal_mode: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("authwatch_audit.db"),
            max_connections: 5,
            acquire_timeout_ms: 5_000,
            busy_timeout_ms: 5_000,
            operation_timeout_ms: 5_000,
            wal_mode: true,
        }
    }
}

impl DatabaseConfig {
    /// Whether this configuration points at an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}

/// Detection thresholds and sliding windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Window for failure streaks and brute-force detection (seconds).
    pub failure_window_secs: u64,
    /// LOGIN/TOTP failures within the failure window that raise BRUTE_FORCE.
    pub brute_force_threshold: u64,
    /// Window for rapid-fire detection (seconds).
    pub rapid_fire_window_secs: u64,
    /// Attempts of any kind within the rapid-fire window that raise RAPID_FIRE.
    pub rapid_fire_threshold: u64,
    /// Off-hours failures within the failure window that raise UNUSUAL_TIMING.
    pub unusual_timing_threshold: u64,
    /// First local hour considered normal activity.
    pub active_hours_start: u32,
    /// First local hour after normal activity ends (exclusive).
    pub active_hours_end: u32,
    /// Offset of the "local" timezone from UTC (minutes).
    pub utc_offset_minutes: i32,
    /// Window for account enumeration detection (seconds).
    pub enumeration_window_secs: u64,
    /// Distinct single-failure principals that raise ACCOUNT_ENUMERATION.
    pub enumeration_threshold: u64,
    /// Interval during which a repeat alert is suppressed (seconds).
    pub dedup_window_secs: u64,
    /// Events stamped up to this far after "now" still count toward a window (seconds).
    pub clock_skew_tolerance_secs: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            failure_window_secs: 15 * 60,
            brute_force_threshold: 5,
            rapid_fire_window_secs: 60,
            rapid_fire_threshold: 10,
            unusual_timing_threshold: 2,
            active_hours_start: 6,
            active_hours_end: 22,
            utc_offset_minutes: 0,
            enumeration_window_secs: 60,
            enumeration_threshold: 5,
            dedup_window_secs: 60 * 60,
            clock_skew_tolerance_secs: 5,
        }
    }
}

impl DetectionConfig {
    pub fn failure_window(&self) -> Duration {
        secs(self.failure_window_secs)
    }

    pub fn rapid_fire_window(&self) -> Duration {
        secs(self.rapid_fire_window_secs)
    }

    pub fn enumeration_window(&self) -> Duration {
        secs(self.enumeration_window_secs)
    }

    pub fn dedup_window(&self) -> Duration {
        secs(self.dedup_window_secs)
    }

    pub fn clock_skew_tolerance(&self) -> Duration {
        secs(self.clock_skew_tolerance_secs)
    }

    /// The timezone used for hour-of-day checks.
    ///
    /// Falls back to UTC for an out-of-range offset; `ConfigLoader` rejects those.
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Whether a local hour-of-day falls outside `[active_hours_start, active_hours_end)`.
    pub fn is_unusual_hour(&self, hour: u32) -> bool {
        hour < self.active_hours_start || hour >= self.active_hours_end
    }
}

// chrono panics above i64::MAX milliseconds.
const MAX_WINDOW_SECS: u64 = (i64::MAX / 1_000) as u64;

fn secs(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_WINDOW_SECS) as i64)
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level (trace, debug, info, warn, error).
    pub level: String,
    /// Output format (pretty, compact, json).
    pub format: String,
    /// Optional log file.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Reporting defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Principals listed in the summary's top-failing table.
    pub top_failing_limit: u32,
    /// Events returned by a user activity query without an explicit limit.
    pub default_activity_limit: u32,
    /// Trailing window covered by a summary without an explicit duration.
    pub default_summary_hours: u32,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            top_failing_limit: 5,
            default_activity_limit: 50,
            default_summary_hours: 24,
        }
    }
}
