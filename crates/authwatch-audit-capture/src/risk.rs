//! Risk assessment for individual events.

use authwatch_audit_types::{EventStatus, EventType, NewAuditEvent, RiskLevel};

/// Assign a risk level to an event about to be appended.
///
/// `prior_failures` is the number of LOGIN/TOTP failures already recorded
/// for the principal within the failure window. The result depends on
/// nothing else.
pub fn assess(event: &NewAuditEvent, prior_failures: u64) -> RiskLevel {
    if event.status == EventStatus::Blocked {
        return RiskLevel::Critical;
    }

    match (event.event_type, event.status) {
        (EventType::Login | EventType::Totp | EventType::Lockout, EventStatus::Failure) => {
            match prior_failures.saturating_add(1) {
                1 => RiskLevel::Low,
                2..=3 => RiskLevel::Medium,
                _ => RiskLevel::High,
            }
        }
        (EventType::Login | EventType::Totp, EventStatus::Success) if prior_failures >= 1 => {
            RiskLevel::Medium
        }
        _ => RiskLevel::Low,
    }
}
