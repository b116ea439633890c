//! SQLite persistence for authwatch.
//!
//! Holds the append-only event log and the alert table, the pool that serves
//! them, and the schema migrations that create them.

pub mod alert_store;
pub mod error;
pub mod event_store;
pub mod migration;
pub mod pool;
pub mod schema;
mod timeout;

pub use alert_store::{AlertStore, SqliteAlertStore};
pub use error::{DbError, DbResult};
pub use event_store::{EventQuery, EventStore, PrincipalFailures, SortOrder, SqliteEventStore, StatusCounts};
pub use pool::{DatabasePool, PoolConfig, PoolConfigBuilder, PoolStats, SynchronousMode};
