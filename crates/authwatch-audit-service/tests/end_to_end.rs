//! Scenarios exercised through the public service interface.

use authwatch_audit_service::{
    AlertType, AuditService, EventDetails, EventStatus, EventType, ExportConfig, ExportFormat, NewAuditEvent,
    RiskLevel, Severity,
};
use authwatch_common_config::AuthwatchConfig;
use authwatch_common_core::TimeRange;
use authwatch_test_utils::{assert_err, at, plus_secs, temp_db_path};
use chrono::{DateTime, Duration, Utc};

fn login(principal: &str, status: EventStatus, ts: DateTime<Utc>) -> NewAuditEvent {
    NewAuditEvent::new(principal, EventType::Login, status).at(ts)
}

#[tokio::test]
async fn brute_force_is_raised_resolved_and_still_exported() {
    let service = AuditService::in_memory().await.unwrap();
    let start = at(10, 0, 0);

    let mut raised = Vec::new();
    for i in 0..5 {
        let outcome = service
            .record_event(login("attacker", EventStatus::Failure, plus_secs(start, i * 60)))
            .await
            .unwrap();
        raised.extend(outcome.alerts);
    }

    assert_eq!(raised.len(), 1);
    let alert = &raised[0];
    assert_eq!(alert.alert_type, AlertType::BruteForce);
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.principal, "attacker");
    assert_eq!(alert.description, "Detected 5 failed login attempts in 15 minutes");
    assert!(!alert.resolved);

    let active = service.get_active_alerts().await.unwrap();
    assert_eq!(active, vec![alert.clone()]);

    assert!(service.resolve_alert(alert.id).await.unwrap());
    assert!(service.get_active_alerts().await.unwrap().is_empty());
    assert!(!service.resolve_alert(alert.id).await.unwrap());

    let export = service.export_audit_log(TimeRange::all()).await.unwrap();
    assert_eq!(export.total_events, 5);
    assert_eq!(export.alerts.len(), 1);
    assert_eq!(export.alerts[0].id, alert.id);
    assert!(export.alerts[0].resolved);
}

#[tokio::test]
async fn repeated_triggers_within_the_hour_are_suppressed() {
    let service = AuditService::in_memory().await.unwrap();
    let start = at(10, 0, 0);

    let mut suppressed = 0;
    for i in 0..8 {
        let outcome = service
            .record_event(login("attacker", EventStatus::Failure, plus_secs(start, i * 30)))
            .await
            .unwrap();
        suppressed += outcome
            .suppressed
            .iter()
            .filter(|t| **t == AlertType::BruteForce)
            .count();
    }
    assert_eq!(suppressed, 3);
    assert_eq!(service.get_active_alerts().await.unwrap().len(), 1);
}

#[tokio::test]
async fn summary_counts_match_recorded_events() {
    let service = AuditService::in_memory().await.unwrap();
    let now = at(12, 0, 0);

    for i in 0..35 {
        service
            .record_event(login(&format!("user{i}"), EventStatus::Success, plus_secs(now, -600 * (i + 1))))
            .await
            .unwrap();
    }
    for i in 0..12 {
        service
            .record_event(login(&format!("user{}", i % 4), EventStatus::Failure, plus_secs(now, -1800 * (i + 1))))
            .await
            .unwrap();
    }

    let summary = service
        .get_summary_as_of(now, Some(Duration::hours(24)))
        .await
        .unwrap();
    assert_eq!(summary.total, 47);
    assert_eq!(summary.success_count, 35);
    assert_eq!(summary.failure_count, 12);
    assert_eq!(summary.blocked_count, 0);
    assert_eq!(summary.top_failing_principals.len(), 4);
    assert!(summary.top_failing_principals.len() <= 5);
}

#[tokio::test]
async fn rapid_fire_fires_without_brute_force() {
    let service = AuditService::in_memory().await.unwrap();
    let start = at(10, 0, 0);

    let mut raised = Vec::new();
    for i in 0..10 {
        let status = if i % 5 == 0 { EventStatus::Failure } else { EventStatus::Success };
        let outcome = service
            .record_event(login("bot", status, plus_secs(start, i * 5)))
            .await
            .unwrap();
        raised.extend(outcome.alerts.into_iter().map(|a| (a.alert_type, a.severity)));
    }

    assert_eq!(raised, vec![(AlertType::RapidFire, Severity::Critical)]);
}

#[tokio::test]
async fn two_failures_at_night_raise_unusual_timing_once() {
    let service = AuditService::in_memory().await.unwrap();
    let night = at(23, 10, 0);

    let first = service
        .record_event(login("owl", EventStatus::Failure, night))
        .await
        .unwrap();
    assert!(first.alerts.is_empty());

    let second = service
        .record_event(login("owl", EventStatus::Failure, plus_secs(night, 120)))
        .await
        .unwrap();
    assert_eq!(second.alerts.len(), 1);
    assert_eq!(second.alerts[0].alert_type, AlertType::UnusualTiming);
    assert_eq!(
        second.alerts[0].description,
        "Multiple failed attempts detected at unusual hour (23:00)"
    );

    let third = service
        .record_event(login("owl", EventStatus::Failure, plus_secs(night, 240)))
        .await
        .unwrap();
    assert!(third.alerts.is_empty());
    assert_eq!(third.suppressed, vec![AlertType::UnusualTiming]);
}

#[tokio::test]
async fn single_failures_across_usernames_raise_enumeration() {
    let service = AuditService::in_memory().await.unwrap();
    let start = at(10, 0, 0);

    let mut raised = Vec::new();
    for (i, name) in ["admin", "root", "test", "guest", "oracle"].iter().enumerate() {
        let outcome = service
            .record_event(login(name, EventStatus::Failure, plus_secs(start, i as i64 * 5)))
            .await
            .unwrap();
        raised.extend(outcome.alerts);
    }

    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].alert_type, AlertType::AccountEnumeration);
    assert_eq!(raised[0].principal, "");
    assert_eq!(
        raised[0].description,
        "Detected single failed attempts against 5 different usernames in 1 minute - possible account enumeration"
    );
}

#[tokio::test]
async fn lockout_is_logged_without_detection() {
    let service = AuditService::in_memory().await.unwrap();
    let outcome = service
        .security_events()
        .lockout("victim", 5, Default::default())
        .await
        .unwrap();

    assert_eq!(outcome.event.risk_level, RiskLevel::Critical);
    assert!(outcome.alerts.is_empty());
    let activity = service.get_user_activity("victim", None).await.unwrap();
    assert_eq!(activity, vec![outcome.event]);
}

#[tokio::test]
async fn unknown_event_type_is_rejected() {
    let service = AuditService::in_memory().await.unwrap();
    let err = assert_err!(
        service
            .record("alice", "PASSWORD_RESET", "SUCCESS", None, EventDetails::new())
            .await
    );
    assert!(err.is_validation());
    assert!(service.get_user_activity("alice", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn subscribers_observe_new_alerts() {
    let service = AuditService::in_memory().await.unwrap();
    let mut alerts = service.subscribe();
    let start = at(10, 0, 0);

    for i in 0..5 {
        service
            .record_event(login("attacker", EventStatus::Failure, plus_secs(start, i)))
            .await
            .unwrap();
    }

    let alert = alerts.try_recv().unwrap();
    assert_eq!(alert.alert_type, AlertType::BruteForce);
    assert!(alerts.try_recv().is_err());
}

#[tokio::test]
async fn state_survives_reopening_the_database() {
    let (_dir, path) = temp_db_path();
    let mut config = AuthwatchConfig::default();
    config.database.path = path.clone();
    let start = at(10, 0, 0);

    {
        let service = AuditService::open(config.clone()).await.unwrap();
        for i in 0..5 {
            service
                .record_event(login("attacker", EventStatus::Failure, plus_secs(start, i)))
                .await
                .unwrap();
        }
        service.close().await;
    }

    let service = AuditService::open(config).await.unwrap();
    service.health_check().await.unwrap();
    let outcome = service
        .record_event(login("attacker", EventStatus::Failure, plus_secs(start, 10)))
        .await
        .unwrap();
    assert_eq!(outcome.event.risk_level, RiskLevel::High);
    assert!(outcome.alerts.is_empty());
    assert_eq!(outcome.suppressed, vec![AlertType::BruteForce]);
    assert_eq!(service.get_active_alerts().await.unwrap().len(), 1);

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("audit.jsonl");
    let doc = service
        .export_audit_log_to_file(TimeRange::all(), &file, &ExportConfig::new(ExportFormat::JsonLines))
        .await
        .unwrap();
    assert_eq!(doc.total_events, 6);
    assert!(file.exists());
}
