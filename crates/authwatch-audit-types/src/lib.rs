//! Audit event and alert types for authwatch.

mod alert;
mod event;
mod id;
mod severity;

pub use alert::{Alert, AlertType, NewAlert};
pub use event::{
    AuditEvent, EventDetails, EventStatus, EventType, NewAuditEvent, MAX_PRINCIPAL_LEN,
    MAX_SOURCE_LEN,
};
pub use id::{AlertId, AuditEventId};
pub use severity::{RiskLevel, Severity};
