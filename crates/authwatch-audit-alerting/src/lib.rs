//! Audit alerting system.
//!
//! Derives sliding-window counts from the event log after each ingested
//! event, runs the pattern detectors against them, and manages the
//! lifecycle of the alerts they raise.

mod aggregator;
mod detection;
mod manager;

pub use aggregator::WindowAggregator;
pub use detection::{DetectionEngine, DetectionReport};
pub use manager::{AlertManager, RaiseOutcome, ALERT_CHANNEL_CAPACITY};

pub use authwatch_audit_types::{Alert, AlertId, AlertType, NewAlert, Severity};
