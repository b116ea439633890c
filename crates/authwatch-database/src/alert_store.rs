//! Alert persistence with storage-level deduplication.

use crate::error::{DbError, DbResult};
use crate::pool::DatabasePool;
use crate::timeout::with_timeout;
use async_trait::async_trait;
use authwatch_audit_types::{Alert, AlertId, AlertType, NewAlert, Severity};
use authwatch_common_core::{from_micros, to_micros, truncate_to_micros, TimeRange};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

const ALERT_COLUMNS: &str =
    "SELECT id, created_micros, principal, alert_type, severity, description, resolved FROM alerts";

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Insert unless an unresolved alert for the same principal and type was
    /// created within `dedup_window` before `alert.created_at`.
    ///
    /// Lookup and insert are one atomic statement. Returns `None` when suppressed.
    async fn insert_unless_active(
        &self,
        alert: NewAlert,
        dedup_window: chrono::Duration,
    ) -> DbResult<Option<Alert>>;

    async fn get(&self, id: AlertId) -> DbResult<Option<Alert>>;

    /// Mark resolved. Returns whether an unresolved alert was changed.
    async fn resolve(&self, id: AlertId) -> DbResult<bool>;

    /// Unresolved alerts, newest first.
    async fn list_active(&self) -> DbResult<Vec<Alert>>;

    /// Alerts created within the inclusive range, oldest first.
    async fn list_in_range(&self, range: &TimeRange) -> DbResult<Vec<Alert>>;

    /// Unresolved alert counts keyed by severity. Absent severities have no entry.
    async fn active_counts_by_severity(&self) -> DbResult<BTreeMap<Severity, u64>>;
}

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: i64,
    created_micros: i64,
    principal: String,
    alert_type: String,
    severity: String,
    description: String,
    resolved: bool,
}

impl AlertRow {
    fn into_alert(self) -> DbResult<Alert> {
        let id = self.id;
        let corrupt = |what: &str, value: &str| {
            DbError::corrupt(format!("alert {id}: invalid {what} '{value}'"))
        };

        Ok(Alert {
            id: AlertId::new(self.id),
            created_at: from_micros(self.created_micros)
                .ok_or_else(|| corrupt("created_at", &self.created_micros.to_string()))?,
            alert_type: self
                .alert_type
                .parse::<AlertType>()
                .map_err(|_| corrupt("alert_type", &self.alert_type))?,
            severity: self
                .severity
                .parse::<Severity>()
                .map_err(|_| corrupt("severity", &self.severity))?,
            principal: self.principal,
            description: self.description,
            resolved: self.resolved,
        })
    }
}

/// SQLite-backed alert table.
#[derive(Debug, Clone)]
pub struct SqliteAlertStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteAlertStore {
    pub fn new(db: &DatabasePool) -> Self {
        Self {
            pool: db.pool().clone(),
            timeout: db.operation_timeout(),
        }
    }

    async fn fetch(&self, mut qb: QueryBuilder<'_, Sqlite>) -> DbResult<Vec<Alert>> {
        let rows = with_timeout(
            self.timeout,
            qb.build_query_as::<AlertRow>().fetch_all(&self.pool),
        )
        .await?;
        rows.into_iter().map(AlertRow::into_alert).collect()
    }
}

#[async_trait]
impl AlertStore for SqliteAlertStore {
    #[instrument(skip(self, alert), fields(principal = %alert.principal, alert_type = %alert.alert_type))]
    async fn insert_unless_active(
        &self,
        alert: NewAlert,
        dedup_window: chrono::Duration,
    ) -> DbResult<Option<Alert>> {
        let created_at = truncate_to_micros(alert.created_at);
        let created_micros = to_micros(created_at);
        let cutoff = created_micros.saturating_sub(dedup_window.num_microseconds().unwrap_or(i64::MAX));

        // A write statement takes SQLite's write lock before it reads, so the
        // NOT EXISTS probe and the insert cannot interleave with another writer.
        let result = with_timeout(
            self.timeout,
            sqlx::query(
                "INSERT INTO alerts (created_micros, principal, alert_type, severity, description, resolved)
                 SELECT ?, ?, ?, ?, ?, 0
                 WHERE NOT EXISTS (
                     SELECT 1 FROM alerts
                     WHERE principal = ? AND alert_type = ? AND resolved = 0 AND created_micros > ?
                 )",
            )
            .bind(created_micros)
            .bind(&alert.principal)
            .bind(alert.alert_type.as_str())
            .bind(alert.severity.to_string())
            .bind(&alert.description)
            .bind(&alert.principal)
            .bind(alert.alert_type.as_str())
            .bind(cutoff)
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            debug!("Alert suppressed by an active duplicate");
            return Ok(None);
        }

        let id = AlertId::new(result.last_insert_rowid());
        Ok(Some(NewAlert { created_at, ..alert }.into_alert(id)))
    }

    async fn get(&self, id: AlertId) -> DbResult<Option<Alert>> {
        let mut qb = QueryBuilder::<Sqlite>::new(ALERT_COLUMNS);
        qb.push(" WHERE id = ").push_bind(id.get());
        Ok(self.fetch(qb).await?.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn resolve(&self, id: AlertId) -> DbResult<bool> {
        let result = with_timeout(
            self.timeout,
            sqlx::query("UPDATE alerts SET resolved = 1 WHERE id = ? AND resolved = 0")
                .bind(id.get())
                .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_active(&self) -> DbResult<Vec<Alert>> {
        let mut qb = QueryBuilder::<Sqlite>::new(ALERT_COLUMNS);
        qb.push(" WHERE resolved = 0 ORDER BY created_micros DESC, id DESC");
        self.fetch(qb).await
    }

    async fn list_in_range(&self, range: &TimeRange) -> DbResult<Vec<Alert>> {
        let mut qb = QueryBuilder::<Sqlite>::new(ALERT_COLUMNS);
        qb.push(" WHERE 1=1");
        if let Some(from) = range.from_micros() {
            qb.push(" AND created_micros >= ").push_bind(from);
        }
        if let Some(to) = range.to_micros() {
            qb.push(" AND created_micros <= ").push_bind(to);
        }
        qb.push(" ORDER BY created_micros ASC, id ASC");
        self.fetch(qb).await
    }

    async fn active_counts_by_severity(&self) -> DbResult<BTreeMap<Severity, u64>> {
        let rows = with_timeout(
            self.timeout,
            sqlx::query_as::<_, (String, i64)>(
                "SELECT severity, COUNT(*) FROM alerts WHERE resolved = 0 GROUP BY severity",
            )
            .fetch_all(&self.pool),
        )
        .await?;

        rows.into_iter()
            .map(|(severity, count)| {
                let severity = severity
                    .parse::<Severity>()
                    .map_err(|_| DbError::corrupt(format!("invalid alert severity '{severity}'")))?;
                Ok((severity, count.max(0) as u64))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolConfig;
    use authwatch_test_utils::{at, plus_secs};
    use chrono::{DateTime, Utc};
    use std::sync::Arc;

    const HOUR: i64 = 3600;

    async fn store() -> SqliteAlertStore {
        let db = DatabasePool::open_in_memory().await.unwrap();
        SqliteAlertStore::new(&db)
    }

    fn brute_force(principal: &str, ts: DateTime<Utc>) -> NewAlert {
        NewAlert::new(AlertType::BruteForce, principal, "Detected 5 failed login attempts in 15 minutes", ts)
    }

    fn window() -> chrono::Duration {
        chrono::Duration::seconds(HOUR)
    }

    #[tokio::test]
    async fn test_second_raise_within_window_is_suppressed() {
        let store = store().await;
        let first = store.insert_unless_active(brute_force("mallory", at(10, 0, 0)), window()).await.unwrap();
        assert!(first.is_some());

        let second = store
            .insert_unless_active(brute_force("mallory", at(10, 30, 0)), window())
            .await
            .unwrap();
        assert!(second.is_none());

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0], first.unwrap());
    }

    #[tokio::test]
    async fn test_suppression_leaves_existing_alert_untouched() {
        let store = store().await;
        let first = store
            .insert_unless_active(brute_force("mallory", at(10, 0, 0)), window())
            .await
            .unwrap()
            .unwrap();

        let escalated = brute_force("mallory", at(10, 5, 0)).with_severity(Severity::Critical);
        assert!(store.insert_unless_active(escalated, window()).await.unwrap().is_none());

        let stored = store.get(first.id).await.unwrap().unwrap();
        assert_eq!(stored.severity, Severity::High);
        assert_eq!(stored.created_at, at(10, 0, 0));
    }

    #[tokio::test]
    async fn test_raise_after_window_creates_new_alert() {
        let store = store().await;
        let base = at(10, 0, 0);
        store.insert_unless_active(brute_force("mallory", base), window()).await.unwrap();

        let later = store
            .insert_unless_active(brute_force("mallory", plus_secs(base, HOUR)), window())
            .await
            .unwrap();
        assert!(later.is_some());
        assert_eq!(store.list_active().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_raise_after_resolve_creates_new_alert() {
        let store = store().await;
        let first = store
            .insert_unless_active(brute_force("mallory", at(10, 0, 0)), window())
            .await
            .unwrap()
            .unwrap();
        assert!(store.resolve(first.id).await.unwrap());

        let again = store
            .insert_unless_active(brute_force("mallory", at(10, 1, 0)), window())
            .await
            .unwrap();
        assert!(again.is_some());
    }

    #[tokio::test]
    async fn test_dedup_is_per_principal_and_type() {
        let store = store().await;
        let ts = at(11, 0, 0);
        assert!(store.insert_unless_active(brute_force("a", ts), window()).await.unwrap().is_some());
        assert!(store.insert_unless_active(brute_force("b", ts), window()).await.unwrap().is_some());
        let rapid = NewAlert::new(AlertType::RapidFire, "a", "Detected 10 attempts in 1 minute", ts);
        assert!(store.insert_unless_active(rapid, window()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let store = store().await;
        let alert = store
            .insert_unless_active(brute_force("mallory", at(10, 0, 0)), window())
            .await
            .unwrap()
            .unwrap();

        assert!(store.resolve(alert.id).await.unwrap());
        assert!(!store.resolve(alert.id).await.unwrap());
        assert!(!store.resolve(AlertId::new(9999)).await.unwrap());

        assert!(store.get(alert.id).await.unwrap().unwrap().resolved);
        assert!(store.list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_active_newest_first_and_counts() {
        let store = store().await;
        store.insert_unless_active(brute_force("a", at(9, 0, 0)), window()).await.unwrap();
        store.insert_unless_active(brute_force("b", at(9, 5, 0)), window()).await.unwrap();
        store
            .insert_unless_active(
                NewAlert::new(AlertType::RapidFire, "b", "Detected 10 attempts in 1 minute", at(9, 2, 0)),
                window(),
            )
            .await
            .unwrap();

        let active = store.list_active().await.unwrap();
        let principals: Vec<_> = active.iter().map(|a| (a.principal.as_str(), a.alert_type)).collect();
        assert_eq!(
            principals,
            vec![("b", AlertType::BruteForce), ("b", AlertType::RapidFire), ("a", AlertType::BruteForce)]
        );

        let counts = store.active_counts_by_severity().await.unwrap();
        assert_eq!(counts.get(&Severity::High), Some(&2));
        assert_eq!(counts.get(&Severity::Critical), Some(&1));
        assert_eq!(counts.get(&Severity::Low), None);
    }

    #[tokio::test]
    async fn test_list_in_range_includes_resolved() {
        let store = store().await;
        let a = store
            .insert_unless_active(brute_force("a", at(9, 0, 0)), window())
            .await
            .unwrap()
            .unwrap();
        store.insert_unless_active(brute_force("b", at(12, 0, 0)), window()).await.unwrap();
        store.resolve(a.id).await.unwrap();

        let morning = store
            .list_in_range(&TimeRange::between(at(8, 0, 0), at(9, 0, 0)))
            .await
            .unwrap();
        assert_eq!(morning.len(), 1);
        assert!(morning[0].resolved);

        assert_eq!(store.list_in_range(&TimeRange::all()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_raises_create_one_alert() {
        let (_dir, path) = authwatch_test_utils::temp_db_path();
        let config = PoolConfig::builder()
            .database_path(&path)
            .max_connections(5)
            .build()
            .unwrap();
        let db = DatabasePool::open(config).await.unwrap();
        let store = Arc::new(SqliteAlertStore::new(&db));

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert_unless_active(brute_force("mallory", plus_secs(at(10, 0, 0), i)), window())
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_some() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.list_active().await.unwrap().len(), 1);
    }
}
