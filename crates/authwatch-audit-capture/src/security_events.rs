//! Typed recorders for each step of an authentication flow.

use crate::capture::{AuditRecorder, RecordOutcome};
use authwatch_audit_types::{EventStatus, EventType, NewAuditEvent};
use authwatch_common_core::Result;
use std::net::IpAddr;
use std::sync::Arc;

/// Security event recorder.
///
/// Wraps [`AuditRecorder`] so login handlers can report what happened
/// without assembling events by hand.
#[derive(Clone)]
pub struct SecurityEventRecorder {
    recorder: Arc<AuditRecorder>,
}

impl SecurityEventRecorder {
    /// Create a new security event recorder.
    pub fn new(recorder: Arc<AuditRecorder>) -> Self {
        Self { recorder }
    }

    /// Record a successful password login.
    pub async fn login_success(&self, username: &str, context: LoginContext) -> Result<RecordOutcome> {
        self.record(context.event(username, EventType::Login, EventStatus::Success))
            .await
    }

    /// Record a failed password login.
    pub async fn login_failure(
        &self,
        username: &str,
        reason: &str,
        context: LoginContext,
    ) -> Result<RecordOutcome> {
        let event = context
            .event(username, EventType::Login, EventStatus::Failure)
            .detail("reason", reason);
        self.record(event).await
    }

    /// Record an accepted one-time code.
    pub async fn totp_success(&self, username: &str, context: LoginContext) -> Result<RecordOutcome> {
        self.record(context.event(username, EventType::Totp, EventStatus::Success))
            .await
    }

    /// Record a rejected one-time code.
    pub async fn totp_failure(
        &self,
        username: &str,
        reason: &str,
        context: LoginContext,
    ) -> Result<RecordOutcome> {
        let event = context
            .event(username, EventType::Totp, EventStatus::Failure)
            .detail("reason", reason);
        self.record(event).await
    }

    /// Record an account registration attempt.
    pub async fn registration(
        &self,
        username: &str,
        success: bool,
        context: LoginContext,
    ) -> Result<RecordOutcome> {
        let status = if success {
            EventStatus::Success
        } else {
            EventStatus::Failure
        };
        self.record(context.event(username, EventType::Registration, status))
            .await
    }

    /// Record that the caller's policy locked the account.
    pub async fn lockout(
        &self,
        username: &str,
        failed_attempts: u32,
        context: LoginContext,
    ) -> Result<RecordOutcome> {
        let event = context
            .event(username, EventType::Lockout, EventStatus::Blocked)
            .detail("failed_attempts", failed_attempts);
        self.record(event).await
    }

    async fn record(&self, event: NewAuditEvent) -> Result<RecordOutcome> {
        self.recorder.record_event(event).await
    }
}

/// Login context information.
#[derive(Debug, Clone, Default)]
pub struct LoginContext {
    pub ip_address: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
}

impl LoginContext {
    /// Context for a request from `ip`.
    pub fn from_ip(ip: IpAddr) -> Self {
        Self {
            ip_address: Some(ip),
            ..Self::default()
        }
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    fn event(self, username: &str, event_type: EventType, status: EventStatus) -> NewAuditEvent {
        let mut event = NewAuditEvent::new(username, event_type, status)
            .maybe_source(self.ip_address.map(|ip| ip.to_string()));
        if let Some(user_agent) = self.user_agent {
            event = event.detail("user_agent", user_agent);
        }
        if let Some(session_id) = self.session_id {
            event = event.detail("session_id", session_id);
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authwatch_audit_alerting::{AlertManager, DetectionEngine, WindowAggregator};
    use authwatch_audit_types::{AlertType, RiskLevel};
    use authwatch_common_config::DetectionConfig;
    use authwatch_database::{DatabasePool, SqliteAlertStore, SqliteEventStore};
    use serde_json::json;

    async fn recorder() -> SecurityEventRecorder {
        let db = DatabasePool::open_in_memory().await.unwrap();
        let events = Arc::new(SqliteEventStore::new(&db));
        let config = DetectionConfig::default();
        let alerts = Arc::new(AlertManager::new(
            Arc::new(SqliteAlertStore::new(&db)),
            config.dedup_window(),
        ));
        let engine = Arc::new(DetectionEngine::new(WindowAggregator::new(events.clone(), config), alerts));
        SecurityEventRecorder::new(Arc::new(AuditRecorder::new(events, engine)))
    }

    fn context() -> LoginContext {
        LoginContext::from_ip("203.0.113.7".parse().unwrap())
            .user_agent("curl/8.0")
            .session_id("s-42")
    }

    #[tokio::test]
    async fn test_login_failure_carries_context() {
        let recorder = recorder().await;
        let outcome = recorder.login_failure("alice", "bad password", context()).await.unwrap();

        let event = outcome.event;
        assert_eq!(event.event_type, EventType::Login);
        assert_eq!(event.status, EventStatus::Failure);
        assert_eq!(event.source.as_deref(), Some("203.0.113.7"));
        assert_eq!(event.details.get("reason"), Some(&json!("bad password")));
        assert_eq!(event.details.get("user_agent"), Some(&json!("curl/8.0")));
        assert_eq!(event.details.get("session_id"), Some(&json!("s-42")));
    }

    #[tokio::test]
    async fn test_login_flow_risk() {
        let recorder = recorder().await;
        recorder.login_failure("alice", "bad password", LoginContext::default()).await.unwrap();
        let totp = recorder.totp_failure("alice", "expired code", LoginContext::default()).await.unwrap();
        assert_eq!(totp.event.risk_level, RiskLevel::Medium);

        let ok = recorder.login_success("alice", LoginContext::default()).await.unwrap();
        assert_eq!(ok.event.risk_level, RiskLevel::Medium);

        let fresh = recorder.totp_success("bob", LoginContext::default()).await.unwrap();
        assert_eq!(fresh.event.risk_level, RiskLevel::Low);
        assert!(fresh.event.source.is_none());
    }

    #[tokio::test]
    async fn test_registration_is_low_risk() {
        let recorder = recorder().await;
        let ok = recorder.registration("carol", true, LoginContext::default()).await.unwrap();
        let failed = recorder.registration("carol", false, LoginContext::default()).await.unwrap();
        assert_eq!(ok.event.status, EventStatus::Success);
        assert_eq!(failed.event.status, EventStatus::Failure);
        assert_eq!(failed.event.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_lockout_records_attempts() {
        let recorder = recorder().await;
        let outcome = recorder.lockout("dave", 5, context()).await.unwrap();
        assert_eq!(outcome.event.status, EventStatus::Blocked);
        assert_eq!(outcome.event.risk_level, RiskLevel::Critical);
        assert_eq!(outcome.event.details.get("failed_attempts"), Some(&json!(5)));
        assert!(outcome.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_failures_alert() {
        let recorder = recorder().await;
        let mut raised = Vec::new();
        for _ in 0..5 {
            let outcome = recorder.login_failure("erin", "bad password", LoginContext::default()).await.unwrap();
            raised.extend(outcome.alerts.into_iter().map(|a| a.alert_type));
        }
        assert!(raised.contains(&AlertType::BruteForce));
    }
}
