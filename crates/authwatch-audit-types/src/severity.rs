//! Severity levels shared by event risk and alert severity.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{Display, EnumIter, EnumString};

/// Coarse rank attached to an alert, or to an event as its risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Severity {
    /// Routine.
    Low,
    /// Noteworthy, warrants review.
    Medium,
    /// Requires prompt attention.
    High,
    /// Requires immediate attention.
    Critical,
}

/// Risk level of an individual event, assigned at write time.
pub type RiskLevel = Severity;

impl Severity {
    /// Numeric value for comparison (higher = more severe).
    pub fn level(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// Check if this severity meets a minimum threshold.
    pub fn meets_threshold(&self, threshold: Self) -> bool {
        self.level() >= threshold.level()
    }

    /// All severities, least severe first.
    pub fn all() -> impl Iterator<Item = Self> {
        use strum::IntoEnumIterator;
        Self::iter()
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.level().cmp(&other.level())
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::Low
    }
}
