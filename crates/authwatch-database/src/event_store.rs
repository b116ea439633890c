//! The append-only audit event log.

use crate::error::{DbError, DbResult};
use crate::pool::DatabasePool;
use crate::timeout::with_timeout;
use async_trait::async_trait;
use authwatch_audit_types::{
    AuditEvent, AuditEventId, EventDetails, EventStatus, EventType, NewAuditEvent, RiskLevel,
};
use authwatch_common_core::{from_micros, to_micros, truncate_to_micros, TimeRange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::ops::Bound;
use std::time::Duration;
use tracing::{debug, instrument};

const EVENT_COLUMNS: &str =
    "SELECT id, ts_micros, principal, event_type, status, source, details, risk_level FROM audit_events";

/// Result ordering by timestamp, ties broken by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    fn sql(&self) -> &'static str {
        match self {
            Self::Ascending => " ORDER BY ts_micros ASC, id ASC",
            Self::Descending => " ORDER BY ts_micros DESC, id DESC",
        }
    }
}

/// Filter over the event log.
///
/// Empty type or status sets match everything.
#[derive(Debug, Clone)]
pub struct EventQuery {
    pub principal: Option<String>,
    pub event_types: Vec<EventType>,
    pub statuses: Vec<EventStatus>,
    pub lower: Bound<DateTime<Utc>>,
    pub upper: Bound<DateTime<Utc>>,
    pub order: SortOrder,
    pub limit: Option<u32>,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            principal: None,
            event_types: Vec::new(),
            statuses: Vec::new(),
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
            order: SortOrder::default(),
            limit: None,
        }
    }
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn event_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types = types.into_iter().collect();
        self
    }

    pub fn statuses(mut self, statuses: impl IntoIterator<Item = EventStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    /// Exclusive lower bound.
    pub fn after(mut self, ts: DateTime<Utc>) -> Self {
        self.lower = Bound::Excluded(ts);
        self
    }

    /// Inclusive lower bound.
    pub fn since(mut self, ts: DateTime<Utc>) -> Self {
        self.lower = Bound::Included(ts);
        self
    }

    /// Inclusive upper bound.
    pub fn until(mut self, ts: DateTime<Utc>) -> Self {
        self.upper = Bound::Included(ts);
        self
    }

    /// Restrict to an inclusive time range.
    pub fn in_range(mut self, range: &TimeRange) -> Self {
        self.lower = range.from.map_or(Bound::Unbounded, Bound::Included);
        self.upper = range.to.map_or(Bound::Unbounded, Bound::Included);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn newest_first(self) -> Self {
        self.order(SortOrder::Descending)
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1=1");

        if let Some(principal) = &self.principal {
            qb.push(" AND principal = ").push_bind(principal.clone());
        }

        if !self.event_types.is_empty() {
            qb.push(" AND event_type IN (");
            let mut list = qb.separated(", ");
            for event_type in &self.event_types {
                list.push_bind(event_type.as_str());
            }
            list.push_unseparated(")");
        }

        if !self.statuses.is_empty() {
            qb.push(" AND status IN (");
            let mut list = qb.separated(", ");
            for status in &self.statuses {
                list.push_bind(status.as_str());
            }
            list.push_unseparated(")");
        }

        match self.lower {
            Bound::Included(ts) => {
                qb.push(" AND ts_micros >= ").push_bind(to_micros(ts));
            }
            Bound::Excluded(ts) => {
                qb.push(" AND ts_micros > ").push_bind(to_micros(ts));
            }
            Bound::Unbounded => {}
        }

        match self.upper {
            Bound::Included(ts) => {
                qb.push(" AND ts_micros <= ").push_bind(to_micros(ts));
            }
            Bound::Excluded(ts) => {
                qb.push(" AND ts_micros < ").push_bind(to_micros(ts));
            }
            Bound::Unbounded => {}
        }
    }

    fn push_limit(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(limit) = self.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }
    }
}

/// Event counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: u64,
    pub success: u64,
    pub failure: u64,
    pub blocked: u64,
}

/// Number of FAILURE events recorded against one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalFailures {
    pub principal: String,
    pub failures: u64,
}

/// Durable, append-only log of audit events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist an event, stamping the current time if it has none.
    ///
    /// The returned event is exactly what later reads return.
    async fn append(&self, event: NewAuditEvent, risk_level: RiskLevel) -> DbResult<AuditEvent>;

    async fn get(&self, id: AuditEventId) -> DbResult<Option<AuditEvent>>;

    async fn query(&self, query: &EventQuery) -> DbResult<Vec<AuditEvent>>;

    async fn count(&self, query: &EventQuery) -> DbResult<u64>;

    /// FAILURE counts grouped by principal, most failures first, then by
    /// principal. The query's status filter is ignored and its limit applies
    /// to principals.
    async fn failure_counts_by_principal(&self, query: &EventQuery) -> DbResult<Vec<PrincipalFailures>>;

    /// Totals by status. The query's status filter and limit are ignored.
    async fn status_counts(&self, query: &EventQuery) -> DbResult<StatusCounts>;

    async fn top_failing_principals(
        &self,
        query: &EventQuery,
        limit: u32,
    ) -> DbResult<Vec<PrincipalFailures>> {
        self.failure_counts_by_principal(&query.clone().limit(limit)).await
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i64,
    ts_micros: i64,
    principal: String,
    event_type: String,
    status: String,
    source: Option<String>,
    details: String,
    risk_level: String,
}

impl EventRow {
    fn into_event(self) -> DbResult<AuditEvent> {
        let corrupt = |what: &str, value: &str| {
            DbError::corrupt(format!("audit event {}: invalid {what} '{value}'", self.id))
        };

        let timestamp = from_micros(self.ts_micros)
            .ok_or_else(|| corrupt("timestamp", &self.ts_micros.to_string()))?;
        let event_type = self
            .event_type
            .parse::<EventType>()
            .map_err(|_| corrupt("event_type", &self.event_type))?;
        let status = self
            .status
            .parse::<EventStatus>()
            .map_err(|_| corrupt("status", &self.status))?;
        let risk_level = self
            .risk_level
            .parse::<RiskLevel>()
            .map_err(|_| corrupt("risk_level", &self.risk_level))?;
        let details: EventDetails =
            serde_json::from_str(&self.details).map_err(|_| corrupt("details", &self.details))?;

        Ok(AuditEvent {
            id: AuditEventId::new(self.id),
            timestamp,
            principal: self.principal,
            event_type,
            status,
            source: self.source,
            details,
            risk_level,
        })
    }
}

/// SQLite-backed event log.
#[derive(Debug, Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteEventStore {
    pub fn new(db: &DatabasePool) -> Self {
        Self {
            pool: db.pool().clone(),
            timeout: db.operation_timeout(),
        }
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    #[instrument(skip(self, event), fields(principal = %event.principal, event_type = %event.event_type))]
    async fn append(&self, event: NewAuditEvent, risk_level: RiskLevel) -> DbResult<AuditEvent> {
        let timestamp = truncate_to_micros(event.timestamp.unwrap_or_else(Utc::now));
        let details = serde_json::to_string(&event.details)?;

        let result = with_timeout(
            self.timeout,
            sqlx::query(
                "INSERT INTO audit_events
                 (ts_micros, principal, event_type, status, source, details, risk_level)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(to_micros(timestamp))
            .bind(&event.principal)
            .bind(event.event_type.as_str())
            .bind(event.status.as_str())
            .bind(&event.source)
            .bind(&details)
            .bind(risk_level.to_string())
            .execute(&self.pool),
        )
        .await?;

        let id = AuditEventId::new(result.last_insert_rowid());
        debug!(event_id = %id, "Appended audit event");
        Ok(event.into_event(id, timestamp, risk_level))
    }

    async fn get(&self, id: AuditEventId) -> DbResult<Option<AuditEvent>> {
        let sql = format!("{EVENT_COLUMNS} WHERE id = ?");
        let row = with_timeout(
            self.timeout,
            sqlx::query_as::<_, EventRow>(&sql)
                .bind(id.get())
                .fetch_optional(&self.pool),
        )
        .await?;

        row.map(EventRow::into_event).transpose()
    }

    #[instrument(skip(self))]
    async fn query(&self, query: &EventQuery) -> DbResult<Vec<AuditEvent>> {
        let rows = with_timeout(self.timeout, async {
            let mut qb = QueryBuilder::<Sqlite>::new(EVENT_COLUMNS);
            query.push_where(&mut qb);
            qb.push(query.order.sql());
            query.push_limit(&mut qb);
            qb.build_query_as::<EventRow>().fetch_all(&self.pool).await
        })
        .await?;

        rows.into_iter().map(EventRow::into_event).collect()
    }

    async fn count(&self, query: &EventQuery) -> DbResult<u64> {
        let count = with_timeout(self.timeout, async {
            let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM audit_events");
            query.push_where(&mut qb);
            qb.build_query_scalar::<i64>().fetch_one(&self.pool).await
        })
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn failure_counts_by_principal(&self, query: &EventQuery) -> DbResult<Vec<PrincipalFailures>> {
        let failures_only = query.clone().statuses([EventStatus::Failure]);

        let rows = with_timeout(self.timeout, async {
            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT principal, COUNT(*) AS failures FROM audit_events",
            );
            failures_only.push_where(&mut qb);
            qb.push(" GROUP BY principal ORDER BY failures DESC, principal ASC");
            failures_only.push_limit(&mut qb);
            qb.build_query_as::<(String, i64)>().fetch_all(&self.pool).await
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|(principal, failures)| PrincipalFailures {
                principal,
                failures: failures.max(0) as u64,
            })
            .collect())
    }

    async fn status_counts(&self, query: &EventQuery) -> DbResult<StatusCounts> {
        let mut any_status = query.clone();
        any_status.statuses.clear();

        let (total, success, failure, blocked) = with_timeout(self.timeout, async {
            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT COUNT(*),
                        COALESCE(SUM(status = 'SUCCESS'), 0),
                        COALESCE(SUM(status = 'FAILURE'), 0),
                        COALESCE(SUM(status = 'BLOCKED'), 0)
                 FROM audit_events",
            );
            any_status.push_where(&mut qb);
            qb.build_query_as::<(i64, i64, i64, i64)>().fetch_one(&self.pool).await
        })
        .await?;

        Ok(StatusCounts {
            total: total.max(0) as u64,
            success: success.max(0) as u64,
            failure: failure.max(0) as u64,
            blocked: blocked.max(0) as u64,
        })
    }
}
