// crates/claudex-db/src/lib.rs
//! Embedded SQL store (component C3, "Store Adapter") over SQLite, with
//! FTS5 full-text search and JSON1 array columns.
//!
//! Failure policy (§4.3): store functions never panic. Read paths return a
//! sentinel (empty list / `None`) and log at WARN on failure; only
//! connection-open and migration failures surface as `DbError` to the
//! caller, since those happen once at startup and a hook cannot proceed
//! without a store at all.

mod migrations;
pub mod pressure_engine;
pub mod pruner;
pub mod queries;

pub use queries::{audit, checkpoint, consensus, integrity, observations, pressure, reasoning, sessions};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("failed to determine claudex home directory")]
    NoHomeDir,

    #[error("failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Main database handle wrapping a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn new(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30))
            .log_slow_statements(
                tracing::log::LevelFilter::Warn,
                std::time::Duration::from_secs(5),
            );

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            db_path: path.to_owned(),
        };
        db.run_migrations().await?;

        info!("claudex store opened at {}", path.display());
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    ///
    /// Uses `shared_cache(true)` so all pool connections share the same
    /// in-memory database — without it, each pooled connection gets its own
    /// separate database and concurrent queries silently see nothing.
    pub async fn new_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .shared_cache(true)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let db = Self {
            pool,
            db_path: PathBuf::new(),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open the database at the default location: `${CLAUDEX_HOME}/db/claudex.db`.
    pub async fn open_default() -> DbResult<Self> {
        let path = default_db_path()?;
        Self::new(&path).await
    }

    /// Run all inline migrations.
    ///
    /// Uses a `_migrations` table to track which migrations have already
    /// been applied, so non-idempotent statements (ALTER TABLE, CREATE
    /// TRIGGER without a guard) only run once.
    async fn run_migrations(&self) -> DbResult<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM _migrations")
            .fetch_one(&self.pool)
            .await?;
        let current_version = row.0 as usize;

        for (i, migration) in migrations::MIGRATIONS.iter().enumerate() {
            let version = i + 1;
            if version <= current_version {
                continue;
            }
            let is_multi_statement = migration.contains("BEGIN;");
            let result = if is_multi_statement {
                sqlx::raw_sql(migration).execute(&self.pool).await.map(|_| ())
            } else {
                sqlx::query(migration).execute(&self.pool).await.map(|_| ())
            };
            match result {
                Ok(_) => {}
                Err(e) if e.to_string().contains("duplicate column name") => {
                    warn!("migration {version} skipped: column already present");
                }
                Err(e) => return Err(e.into()),
            }
            sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
                .bind(version as i64)
                .execute(&self.pool)
                .await?;
            sqlx::query(
                "INSERT OR IGNORE INTO schema_versions (version, applied_at_epoch, description) VALUES (?, ?, ?)",
            )
            .bind(version as i64)
            .bind(chrono::Utc::now().timestamp_millis())
            .bind(format!("migration {version}"))
            .execute(&self.pool)
            .await
            .ok(); // schema_versions itself is created by a later migration on first run
        }

        self.ensure_schema_columns().await?;
        Ok(())
    }

    /// Reconciliation pass: ensure columns expected by the current code
    /// exist even when a drifted branch occupied the same migration version
    /// slots with different SQL.
    async fn ensure_schema_columns(&self) -> DbResult<()> {
        let expected_pressure_cols = &[("decay_rate", "REAL NOT NULL DEFAULT 0.05")];
        for (col, typedef) in expected_pressure_cols {
            self.add_column_if_missing("pressure_scores", col, typedef).await?;
        }
        Ok(())
    }

    async fn add_column_if_missing(&self, table: &str, column: &str, typedef: &str) -> DbResult<()> {
        let columns: Vec<(String,)> =
            sqlx::query_as(&format!("SELECT name FROM pragma_table_info('{table}')"))
                .fetch_all(&self.pool)
                .await?;
        let has_column = columns.iter().any(|(name,)| name == column);
        if !has_column {
            sqlx::query(&format!("ALTER TABLE {table} ADD COLUMN {column} {typedef}"))
                .execute(&self.pool)
                .await?;
            info!("schema reconciliation: added {table}.{column}");
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Path to the database file. Empty for in-memory databases.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Default database path: `${CLAUDEX_HOME}/db/claudex.db`.
pub fn default_db_path() -> DbResult<PathBuf> {
    claudex_core::paths::db_path().ok_or(DbError::NoHomeDir)
}
