//! Schema for the audit log and alert tables.
//!
//! Timestamps are INTEGER microseconds since the Unix epoch. Append-only
//! rules are enforced by triggers so that no writer, including ad hoc SQL,
//! can rewrite history.

use crate::migration::{Migration, MigrationError, MigrationResult, MigrationRunner};
use sqlx::SqlitePool;
use tracing::info;

const V1_AUDIT_LOG: &str = r#"
CREATE TABLE audit_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ts_micros INTEGER NOT NULL,
    principal TEXT NOT NULL DEFAULT '',
    event_type TEXT NOT NULL CHECK (event_type IN ('LOGIN', 'TOTP', 'REGISTRATION', 'LOCKOUT')),
    status TEXT NOT NULL CHECK (status IN ('SUCCESS', 'FAILURE', 'BLOCKED')),
    source TEXT,
    details TEXT NOT NULL DEFAULT '{}',
    risk_level TEXT NOT NULL CHECK (risk_level IN ('LOW', 'MEDIUM', 'HIGH', 'CRITICAL'))
);

CREATE INDEX idx_audit_events_principal_ts ON audit_events (principal, ts_micros);
CREATE INDEX idx_audit_events_ts ON audit_events (ts_micros);

CREATE TRIGGER audit_events_no_update BEFORE UPDATE ON audit_events
BEGIN
    SELECT RAISE(ABORT, 'audit_events is append-only');
END;

CREATE TRIGGER audit_events_no_delete BEFORE DELETE ON audit_events
BEGIN
    SELECT RAISE(ABORT, 'audit_events is append-only');
END;

CREATE TABLE alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_micros INTEGER NOT NULL,
    principal TEXT NOT NULL DEFAULT '',
    alert_type TEXT NOT NULL CHECK (alert_type IN ('BRUTE_FORCE', 'RAPID_FIRE', 'UNUSUAL_TIMING', 'ACCOUNT_ENUMERATION')),
    severity TEXT NOT NULL CHECK (severity IN ('LOW', 'MEDIUM', 'HIGH', 'CRITICAL')),
    description TEXT NOT NULL,
    resolved INTEGER NOT NULL DEFAULT 0 CHECK (resolved IN (0, 1))
);

CREATE INDEX idx_alerts_dedup ON alerts (principal, alert_type, created_micros);
CREATE INDEX idx_alerts_active ON alerts (resolved, created_micros);

CREATE TRIGGER alerts_no_delete BEFORE DELETE ON alerts
BEGIN
    SELECT RAISE(ABORT, 'alerts are never deleted');
END;

CREATE TRIGGER alerts_only_resolved_changes BEFORE UPDATE ON alerts
WHEN NEW.id IS NOT OLD.id
    OR NEW.created_micros IS NOT OLD.created_micros
    OR NEW.principal IS NOT OLD.principal
    OR NEW.alert_type IS NOT OLD.alert_type
    OR NEW.severity IS NOT OLD.severity
    OR NEW.description IS NOT OLD.description
BEGIN
    SELECT RAISE(ABORT, 'only alerts.resolved may change');
END;
"#;

/// All schema migrations, in version order.
pub fn migrations() -> Vec<Migration> {
    vec![Migration::new(1, "audit_log_and_alerts", V1_AUDIT_LOG)]
}

/// Apply pending migrations, refusing to run against a drifted schema.
pub async fn migrate(pool: &SqlitePool) -> Result<Vec<MigrationResult>, MigrationError> {
    let mut runner = MigrationRunner::new(pool.clone());
    runner.add_migrations(migrations());

    let mismatches = runner.verify().await?;
    if !mismatches.is_empty() {
        return Err(MigrationError::ChecksumMismatch(mismatches.join("; ")));
    }

    let applied = runner.run().await?;
    if !applied.is_empty() {
        info!(count = applied.len(), "Applied schema migrations");
    }
    Ok(applied)
}
