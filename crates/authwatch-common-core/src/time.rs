//! Timestamp utilities.
//!
//! Event and alert times are persisted as microseconds since the Unix epoch,
//! so every timestamp that crosses the storage boundary is truncated to
//! microsecond precision.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const MICROS_PER_SEC: i64 = 1_000_000;

/// Convert a timestamp to microseconds since the Unix epoch.
pub fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp() * MICROS_PER_SEC + i64::from(ts.timestamp_subsec_micros())
}

/// Convert microseconds since the Unix epoch back to a timestamp.
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn from_micros(micros: i64) -> Option<DateTime<Utc>> {
    let secs = micros.div_euclid(MICROS_PER_SEC);
    let nanos = (micros.rem_euclid(MICROS_PER_SEC) * 1_000) as u32;
    Utc.timestamp_opt(secs, nanos).single()
}

/// Truncate a timestamp to the precision the store keeps.
pub fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    from_micros(to_micros(ts)).unwrap_or(ts)
}

/// An optionally bounded, inclusive time range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive lower bound (`None` = unbounded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound (`None` = unbounded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// The unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    /// `[from, to]`.
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    /// `[from, ..)`.
    pub fn since(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    /// The trailing `duration` ending at `now`.
    pub fn trailing(now: DateTime<Utc>, duration: Duration) -> Self {
        Self::between(now - duration, now)
    }

    /// Check if a timestamp falls within the range.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }

    /// Whether the range is empty (lower bound after upper bound).
    pub fn is_empty(&self) -> bool {
        matches!((self.from, self.to), (Some(from), Some(to)) if from > to)
    }

    /// Lower bound in microseconds.
    pub fn from_micros(&self) -> Option<i64> {
        self.from.map(to_micros)
    }

    /// Upper bound in microseconds.
    pub fn to_micros(&self) -> Option<i64> {
        self.to.map(to_micros)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<DateTime<Utc>>| b.map(|ts| ts.to_rfc3339()).unwrap_or_else(|| "*".to_string());
        write!(f, "[{}, {}]", bound(self.from), bound(self.to))
    }
}
