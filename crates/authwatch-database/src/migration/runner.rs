use super::types::*;
use chrono::Utc;
use sqlx::{Executor, Row, SqlitePool};
use std::collections::BTreeMap;
use tracing::{debug, info};

const MIGRATIONS_TABLE: &str = "_authwatch_migrations";

pub struct MigrationRunner {
    pool: SqlitePool,
    migrations: BTreeMap<i64, Migration>,
}

impl MigrationRunner {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            migrations: BTreeMap::new(),
        }
    }

    pub fn add_migration(&mut self, migration: Migration) {
        self.migrations.insert(migration.version, migration);
    }

    pub fn add_migrations(&mut self, migrations: Vec<Migration>) {
        for migration in migrations {
            self.add_migration(migration);
        }
    }

    /// Initialize the migration tracking table
    pub async fn init(&self) -> Result<(), MigrationError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                checksum TEXT NOT NULL,
                applied_at DATETIME NOT NULL,
                execution_time_ms INTEGER NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get current database version (highest applied migration)
    pub async fn current_version(&self) -> Result<Option<i64>, MigrationError> {
        self.init().await?;

        let row = sqlx::query(&format!("SELECT MAX(version) as version FROM {MIGRATIONS_TABLE}"))
            .fetch_one(&self.pool)
            .await?;

        let version: Option<i64> = row.try_get("version")?;
        Ok(version)
    }

    /// Get list of applied migrations
    pub async fn get_applied(&self) -> Result<Vec<AppliedMigration>, MigrationError> {
        self.init().await?;

        let applied = sqlx::query_as::<_, AppliedMigration>(&format!(
            "SELECT version, name, checksum, applied_at, execution_time_ms
             FROM {MIGRATIONS_TABLE}
             ORDER BY version"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(applied)
    }

    /// Get list of pending migrations
    pub async fn pending(&self) -> Result<Vec<Migration>, MigrationError> {
        let current = self.current_version().await?.unwrap_or(0);

        Ok(self
            .migrations
            .range(current + 1..)
            .map(|(_, m)| m.clone())
            .collect())
    }

    /// Run all pending migrations
    pub async fn run(&self) -> Result<Vec<MigrationResult>, MigrationError> {
        let pending = self.pending().await?;
        if pending.is_empty() {
            debug!("Schema is up to date");
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(pending.len());
        for migration in pending {
            results.push(self.apply(migration).await?);
        }
        Ok(results)
    }

    /// Verify migration checksums
    pub async fn verify(&self) -> Result<Vec<String>, MigrationError> {
        let applied = self.get_applied().await?;
        let mut mismatches = Vec::new();

        for applied_migration in applied {
            if let Some(known) = self.migrations.get(&applied_migration.version) {
                if applied_migration.checksum != known.checksum {
                    mismatches.push(format!(
                        "Migration {} checksum mismatch: expected {}, found {}",
                        applied_migration.version, known.checksum, applied_migration.checksum
                    ));
                }
            } else {
                mismatches.push(format!(
                    "Migration {} is applied but no longer known",
                    applied_migration.version
                ));
            }
        }

        Ok(mismatches)
    }

    /// Apply one migration and record it in a single transaction.
    async fn apply(&self, migration: Migration) -> Result<MigrationResult, MigrationError> {
        let start = std::time::Instant::now();
        info!("Applying migration: {} - {}", migration.version, migration.name);

        let mut tx = self.pool.begin().await?;

        (&mut *tx).execute(migration.up_sql.as_str()).await.map_err(|e| {
            MigrationError::ExecutionFailed(format!(
                "Failed to apply migration {}: {}",
                migration.version, e
            ))
        })?;

        let execution_time_ms = start.elapsed().as_millis() as i64;
        sqlx::query(&format!(
            "INSERT INTO {MIGRATIONS_TABLE}
             (version, name, checksum, applied_at, execution_time_ms)
             VALUES (?, ?, ?, ?, ?)"
        ))
        .bind(migration.version)
        .bind(&migration.name)
        .bind(&migration.checksum)
        .bind(Utc::now())
        .bind(execution_time_ms)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(MigrationResult {
            version: migration.version,
            name: migration.name,
            execution_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_migration_runner_init() {
        let pool = setup_pool().await;
        let runner = MigrationRunner::new(pool);

        runner.init().await.unwrap();

        let current = runner.current_version().await.unwrap();
        assert_eq!(current, None);
    }

    #[tokio::test]
    async fn test_migration_execution() {
        let pool = setup_pool().await;
        let mut runner = MigrationRunner::new(pool);

        runner.add_migration(Migration::new(
            1,
            "test_migration",
            "CREATE TABLE test_table (id INTEGER PRIMARY KEY); CREATE INDEX idx_test ON test_table (id);",
        ));

        let results = runner.run().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].version, 1);

        let current = runner.current_version().await.unwrap();
        assert_eq!(current, Some(1));

        // Second run is a no-op.
        assert!(runner.run().await.unwrap().is_empty());
        assert!(runner.verify().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_migration_is_not_recorded() {
        let pool = setup_pool().await;
        let mut runner = MigrationRunner::new(pool);
        runner.add_migration(Migration::new(1, "broken", "CREATE TABLE oops ("));

        let result = runner.run().await;
        assert!(matches!(result, Err(MigrationError::ExecutionFailed(_))));
        assert_eq!(runner.current_version().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_verify_reports_drift() {
        let pool = setup_pool().await;
        let mut runner = MigrationRunner::new(pool.clone());
        runner.add_migration(Migration::new(1, "v1", "CREATE TABLE a (id INTEGER)"));
        runner.run().await.unwrap();

        let mut edited = MigrationRunner::new(pool);
        edited.add_migration(Migration::new(1, "v1", "CREATE TABLE a (id INTEGER, x TEXT)"));
        let mismatches = edited.verify().await.unwrap();
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].contains("checksum mismatch"));
    }
}
