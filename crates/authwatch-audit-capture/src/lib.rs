//! Event ingestion for authwatch.
//!
//! This crate turns a collaborator's authentication event into a durable,
//! risk-tagged audit record and runs detection against it:
//!
//! - Deterministic risk assessment from the principal's failure streak
//! - The `record_event` pipeline (validate, stamp, assess, append, detect)
//! - A convenience recorder for each step of a login flow

mod capture;
mod risk;
mod security_events;

pub use capture::{AuditRecorder, RecordOutcome};
pub use risk::assess;
pub use security_events::{LoginContext, SecurityEventRecorder};

// Re-export types for convenience
pub use authwatch_audit_types::{
    AuditEvent, EventDetails, EventStatus, EventType, NewAuditEvent, RiskLevel,
};
