//! Alert types.

use crate::{AlertId, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Attack pattern an alert reports.
///
/// Declaration order is detector evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AlertType {
    /// Repeated credential failures for one principal.
    BruteForce,
    /// Burst of attempts for one principal.
    RapidFire,
    /// Failures outside active hours.
    UnusualTiming,
    /// Single failures across many principals.
    AccountEnumeration,
}

impl AlertType {
    /// Severity of alerts raised by this detector.
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::BruteForce => Severity::High,
            Self::RapidFire => Severity::Critical,
            Self::UnusualTiming => Severity::Medium,
            Self::AccountEnumeration => Severity::Medium,
        }
    }

    /// Whether the detector is scoped to a single principal.
    pub fn is_per_principal(&self) -> bool {
        !matches!(self, Self::AccountEnumeration)
    }

    /// All alert types in evaluation order.
    pub fn evaluation_order() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A persisted alert. Only `resolved` ever changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Store-assigned identifier.
    pub id: AlertId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Subject; empty for global patterns.
    pub principal: String,
    /// Pattern detected.
    pub alert_type: AlertType,
    /// Severity.
    pub severity: Severity,
    /// Human-readable summary with the triggering counts.
    pub description: String,
    /// Whether an operator has resolved it.
    pub resolved: bool,
}

/// An alert about to be raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlert {
    pub created_at: DateTime<Utc>,
    pub principal: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub description: String,
}

impl NewAlert {
    /// Create an alert with the detector's default severity.
    pub fn new(
        alert_type: AlertType,
        principal: impl Into<String>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            created_at,
            principal: principal.into(),
            alert_type,
            severity: alert_type.default_severity(),
            description: description.into(),
        }
    }

    /// Override the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Complete with the store-assigned id.
    pub fn into_alert(self, id: AlertId) -> Alert {
        Alert {
            id,
            created_at: self.created_at,
            principal: self.principal,
            alert_type: self.alert_type,
            severity: self.severity,
            description: self.description,
            resolved: false,
        }
    }
}
