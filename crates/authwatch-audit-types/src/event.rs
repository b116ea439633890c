//! Authentication audit event types.

use crate::{AuditEventId, RiskLevel};
use authwatch_common_core::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Maximum length of a principal, in characters.
pub const MAX_PRINCIPAL_LEN: usize = 256;
/// Maximum length of a source, in characters.
pub const MAX_SOURCE_LEN: usize = 256;

/// Opaque structured payload attached to an event.
///
/// Stored and returned verbatim, never interpreted.
pub type EventDetails = BTreeMap<String, serde_json::Value>;

/// Kind of authentication step an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum EventType {
    /// Primary credential check.
    Login,
    /// Second-factor check.
    Totp,
    /// Account registration.
    Registration,
    /// Lockout decision by the credential layer.
    Lockout,
}

impl EventType {
    /// Whether this is a credential check counted towards failure streaks.
    pub fn is_credential_check(&self) -> bool {
        matches!(self, Self::Login | Self::Totp)
    }

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Outcome of the authentication step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum EventStatus {
    /// Step succeeded.
    Success,
    /// Step failed.
    Failure,
    /// Step was refused outright.
    Blocked,
}

impl EventStatus {
    /// Check if the status is a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure)
    }

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A persisted audit event. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Store-assigned identifier.
    pub id: AuditEventId,
    /// When the event occurred (UTC, microsecond precision).
    pub timestamp: DateTime<Utc>,
    /// Account the event concerns; empty for pre-auth probes.
    pub principal: String,
    /// Kind of step.
    pub event_type: EventType,
    /// Outcome.
    pub status: EventStatus,
    /// Client or network origin, if known.
    pub source: Option<String>,
    /// Passthrough payload.
    #[serde(default)]
    pub details: EventDetails,
    /// Risk assigned at write time.
    pub risk_level: RiskLevel,
}

impl AuditEvent {
    /// Start building a new event.
    pub fn builder(
        principal: impl Into<String>,
        event_type: EventType,
        status: EventStatus,
    ) -> NewAuditEvent {
        NewAuditEvent::new(principal, event_type, status)
    }

    /// Whether this is a LOGIN/TOTP failure.
    pub fn is_credential_failure(&self) -> bool {
        self.event_type.is_credential_check() && self.status.is_failure()
    }
}

/// An event as submitted by a collaborator, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEvent {
    /// Event time; stamped with the current time on ingestion when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Account the event concerns.
    #[serde(default)]
    pub principal: String,
    /// Kind of step.
    pub event_type: EventType,
    /// Outcome.
    pub status: EventStatus,
    /// Client or network origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Passthrough payload.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: EventDetails,
}

impl NewAuditEvent {
    /// Create a new event with no source, details or timestamp.
    pub fn new(principal: impl Into<String>, event_type: EventType, status: EventStatus) -> Self {
        Self {
            timestamp: None,
            principal: principal.into(),
            event_type,
            status,
            source: None,
            details: EventDetails::new(),
        }
    }

    /// Create from string-typed event type and status.
    ///
    /// Names are matched case-insensitively; unknown names are a validation error.
    pub fn parse(principal: impl Into<String>, event_type: &str, status: &str) -> Result<Self> {
        let event_type = event_type
            .trim()
            .parse::<EventType>()
            .map_err(|_| Error::validation(format!("unknown event type '{event_type}'")))?;
        let status = status
            .trim()
            .parse::<EventStatus>()
            .map_err(|_| Error::validation(format!("unknown event status '{status}'")))?;
        Ok(Self::new(principal, event_type, status))
    }

    /// Set the event time.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the source.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the source if one is known.
    pub fn maybe_source(mut self, source: Option<impl Into<String>>) -> Self {
        self.source = source.map(Into::into);
        self
    }

    /// Add a detail entry.
    pub fn detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(json) = serde_json::to_value(value) {
            self.details.insert(key.into(), json);
        }
        self
    }

    /// Replace the detail payload.
    pub fn details(mut self, details: EventDetails) -> Self {
        self.details = details;
        self
    }

    /// Reject malformed fields before the event reaches the store.
    pub fn validate(&self) -> Result<()> {
        if self.principal.chars().count() > MAX_PRINCIPAL_LEN {
            return Err(Error::validation(format!(
                "principal exceeds {MAX_PRINCIPAL_LEN} characters"
            )));
        }
        if self.principal.chars().any(char::is_control) {
            return Err(Error::validation("principal contains control characters"));
        }
        if let Some(source) = &self.source {
            if source.chars().count() > MAX_SOURCE_LEN {
                return Err(Error::validation(format!(
                    "source exceeds {MAX_SOURCE_LEN} characters"
                )));
            }
        }
        Ok(())
    }

    /// Whether this is a LOGIN/TOTP failure.
    pub fn is_credential_failure(&self) -> bool {
        self.event_type.is_credential_check() && self.status.is_failure()
    }

    /// Complete the event with store-assigned fields.
    pub fn into_event(self, id: AuditEventId, timestamp: DateTime<Utc>, risk_level: RiskLevel) -> AuditEvent {
        AuditEvent {
            id,
            timestamp,
            principal: self.principal,
            event_type: self.event_type,
            status: self.status,
            source: self.source,
            details: self.details,
            risk_level,
        }
    }
}
