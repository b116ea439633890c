use crate::error::{DbError, DbResult};
use crate::schema;
use authwatch_common_config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Path to SQLite database file, or `:memory:`
    pub database_path: String,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Connection acquire timeout
    pub acquire_timeout: Duration,
    /// Idle connection timeout (`None` keeps connections forever)
    pub idle_timeout: Option<Duration>,
    /// Maximum connection lifetime (`None` keeps connections forever)
    pub max_lifetime: Option<Duration>,
    /// Enable WAL mode for better concurrency
    pub wal_mode: bool,
    /// Synchronous mode setting
    pub synchronous: SynchronousMode,
    /// Busy timeout for locked database
    pub busy_timeout: Duration,
    /// Upper bound on any single storage call
    pub operation_timeout: Duration,
    /// Create database if not exists
    pub create_if_missing: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum SynchronousMode {
    Off,
    Normal,
    #[default]
    Full,
    Extra,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            database_path: "authwatch_audit.db".to_string(),
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
            wal_mode: true,
            synchronous: SynchronousMode::Full,
            busy_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(5),
            create_if_missing: true,
        }
    }
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }

    /// A private in-memory database.
    ///
    /// Every SQLite connection to `:memory:` is its own database, so the pool
    /// holds exactly one connection and never recycles it.
    pub fn in_memory() -> Self {
        Self {
            database_path: IN_MEMORY.to_string(),
            min_connections: 1,
            max_connections: 1,
            idle_timeout: None,
            max_lifetime: None,
            wal_mode: false,
            ..Default::default()
        }
    }

    /// Build from the `database` section of the configuration file.
    pub fn from_database_config(config: &DatabaseConfig) -> Self {
        let base = if config.is_in_memory() {
            Self::in_memory()
        } else {
            Self {
                database_path: config.path.to_string_lossy().into_owned(),
                max_connections: config.max_connections,
                wal_mode: config.wal_mode,
                ..Default::default()
            }
        };

        Self {
            acquire_timeout: Duration::from_millis(config.acquire_timeout_ms),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            ..base
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY
    }

    pub fn validate(&self) -> DbResult<()> {
        if self.min_connections > self.max_connections {
            return Err(DbError::InvalidConfig(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "max_connections must be at least 1".to_string(),
            ));
        }

        if self.is_in_memory() && self.max_connections != 1 {
            return Err(DbError::InvalidConfig(
                "an in-memory database must use exactly one connection".to_string(),
            ));
        }

        if self.operation_timeout.is_zero() {
            return Err(DbError::InvalidConfig(
                "operation_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    pub fn database_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.database_path = path.as_ref().to_string_lossy().into_owned();
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.config.min_connections = min;
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.config.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire_timeout = timeout;
        self
    }

    pub fn wal_mode(mut self, enabled: bool) -> Self {
        self.config.wal_mode = enabled;
        self
    }

    pub fn synchronous(mut self, mode: SynchronousMode) -> Self {
        self.config.synchronous = mode;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.config.busy_timeout = timeout;
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.config.operation_timeout = timeout;
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.config.create_if_missing = create;
        self
    }

    pub fn build(self) -> DbResult<PoolConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Database connection pool wrapper
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
    config: PoolConfig,
}

impl DatabasePool {
    /// Connect without touching the schema.
    #[instrument(skip(config), fields(path = %config.database_path))]
    pub async fn new(config: PoolConfig) -> DbResult<Self> {
        config.validate()?;

        let connect_options = Self::build_connect_options(&config)?;

        let pool = SqlitePoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(connect_options)
            .await?;

        info!("Database pool created with {} max connections", config.max_connections);

        let db_pool = Self { pool, config };
        db_pool.health_check().await?;

        Ok(db_pool)
    }

    /// Connect and bring the schema up to date.
    pub async fn open(config: PoolConfig) -> DbResult<Self> {
        let db_pool = Self::new(config).await?;
        schema::migrate(&db_pool.pool).await?;
        Ok(db_pool)
    }

    /// Open a fresh, migrated in-memory database.
    pub async fn open_in_memory() -> DbResult<Self> {
        Self::open(PoolConfig::in_memory()).await
    }

    fn build_connect_options(config: &PoolConfig) -> DbResult<SqliteConnectOptions> {
        let mut options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::InvalidConfig(e.to_string()))?
        } else {
            SqliteConnectOptions::new().filename(&config.database_path)
        };

        options = options
            .create_if_missing(config.create_if_missing)
            .busy_timeout(config.busy_timeout);

        if config.wal_mode {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        options = match config.synchronous {
            SynchronousMode::Off => options.synchronous(SqliteSynchronous::Off),
            SynchronousMode::Normal => options.synchronous(SqliteSynchronous::Normal),
            SynchronousMode::Full => options.synchronous(SqliteSynchronous::Full),
            SynchronousMode::Extra => options.synchronous(SqliteSynchronous::Extra),
        };

        Ok(options)
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Upper bound applied to each storage call.
    pub fn operation_timeout(&self) -> Duration {
        self.config.operation_timeout
    }

    /// Perform health check
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbError::HealthCheck(e.to_string()))?;

        Ok(())
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
            max_connections: self.config.max_connections,
        }
    }

    /// Close the pool gracefully
    #[instrument(skip(self))]
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    /// Check if pool is closed
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
    pub max_connections: u32,
}

impl PoolStats {
    pub fn utilization(&self) -> f64 {
        if self.max_connections == 0 {
            return 0.0;
        }
        (self.size as f64 - self.idle as f64) / self.max_connections as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_create_in_memory_pool() {
        let pool = DatabasePool::new(PoolConfig::in_memory()).await.unwrap();

        assert!(!pool.is_closed());
        pool.health_check().await.unwrap();
        pool.close().await;
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn test_pool_stats() {
        let pool = DatabasePool::new(PoolConfig::in_memory()).await.unwrap();

        let stats = pool.stats();
        assert!(stats.size >= 1);
        assert!(stats.utilization() <= 1.0);

        pool.close().await;
    }

    #[tokio::test]
    async fn test_open_creates_file_and_schema() {
        let (_dir, path) = authwatch_test_utils::temp_db_path();
        let config = PoolConfig::builder().database_path(&path).build().unwrap();
        let pool = DatabasePool::open(config).await.unwrap();

        assert!(path.exists());
        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('audit_events', 'alerts') ORDER BY name")
                .fetch_all(pool.pool())
                .await
                .unwrap();
        assert_eq!(tables, vec![("alerts".to_string(),), ("audit_events".to_string(),)]);
    }

    #[test]
    fn test_config_validation() {
        let result = PoolConfig::builder()
            .min_connections(10)
            .max_connections(5)
            .build();
        assert!(result.is_err());

        let result = PoolConfig::builder()
            .database_path(":memory:")
            .max_connections(4)
            .build();
        assert!(matches!(result, Err(DbError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_database_config() {
        let config = DatabaseConfig {
            path: PathBuf::from("/var/lib/authwatch/audit.db"),
            max_connections: 8,
            operation_timeout_ms: 250,
            ..DatabaseConfig::default()
        };
        let pool_config = PoolConfig::from_database_config(&config);
        assert_eq!(pool_config.database_path, "/var/lib/authwatch/audit.db");
        assert_eq!(pool_config.max_connections, 8);
        assert_eq!(pool_config.operation_timeout, Duration::from_millis(250));
        assert!(pool_config.wal_mode);

        let memory = DatabaseConfig {
            path: PathBuf::from(":memory:"),
            max_connections: 8,
            ..DatabaseConfig::default()
        };
        let pool_config = PoolConfig::from_database_config(&memory);
        assert!(pool_config.is_in_memory());
        assert_eq!(pool_config.max_connections, 1);
        assert!(pool_config.idle_timeout.is_none());
        assert!(pool_config.max_lifetime.is_none());
    }
}
