//! Database layer for the live store.
//!
//! The live store is a single SQLite file. Besides the domain tables (owned
//! elsewhere) it carries the two tables this crate relies on:
//! - `global_settings` - key-value settings, including auto-backup config
//! - `audit_log` - append-only audit trail
//!
//! The module is organized into submodules:
//! - `records` - record types
//! - `settings` - `SettingsStore` and its SQLite implementation
//! - `audit` - `AuditSink` and its SQLite implementation

mod audit;
mod records;
mod settings;

pub use audit::AuditSink;
pub use records::*;
pub use settings::SettingsStore;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::errors::{BackupError, BackupResult, StorageError};

pub struct Database {
    pool: Pool<Sqlite>,
    path: PathBuf,
}

impl Database {
    /// Expose pool for domain tables and integration test queries
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn new(database_path: impl AsRef<Path>) -> Result<Self> {
        let database_path = database_path.as_ref();
        info!("=== Starting database initialization ===");
        info!("Database path: {}", database_path.display());

        // Ensure parent directory exists
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    error!("FAILED to create parent directory {:?}: {}", parent, e);
                    return Err(e.into());
                }
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);

        let pool = match SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
        {
            Ok(pool) => {
                info!("Successfully connected to SQLite database");
                pool
            }
            Err(e) => {
                error!("FAILED to connect to database: {}", e);
                error!("   Database path: {}", database_path.display());
                return Err(e.into());
            }
        };

        let database = Self {
            pool,
            path: database_path.to_path_buf(),
        };

        if let Err(e) = database.initialize_tables().await {
            error!("CRITICAL: Database table initialization failed: {}", e);
            return Err(e);
        }

        info!("=== Database initialization completed successfully ===");
        Ok(database)
    }

    async fn initialize_tables(&self) -> Result<()> {
        let settings_table_sql = r#"
            CREATE TABLE IF NOT EXISTS global_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME NOT NULL
            )
        "#;

        if let Err(e) = sqlx::query(settings_table_sql).execute(&self.pool).await {
            error!("FAILED to create global_settings table: {}", e);
            return Err(e.into());
        }
        debug!("global_settings table ready");

        let audit_table_sql = r#"
            CREATE TABLE IF NOT EXISTS audit_log (
                id TEXT PRIMARY KEY,
                action TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                details TEXT,
                timestamp DATETIME NOT NULL
            )
        "#;

        if let Err(e) = sqlx::query(audit_table_sql).execute(&self.pool).await {
            error!("FAILED to create audit_log table: {}", e);
            return Err(e.into());
        }

        let audit_index_sql =
            "CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp DESC)";
        if let Err(e) = sqlx::query(audit_index_sql).execute(&self.pool).await {
            error!("FAILED to create audit_log index: {}", e);
            return Err(e.into());
        }
        debug!("audit_log table ready");

        Ok(())
    }

    /// Write a transactionally consistent copy of the store to `target`.
    ///
    /// Uses SQLite's `VACUUM INTO`, which reads inside a single read
    /// transaction, so concurrent writers never produce a torn copy. The
    /// target must not exist.
    pub async fn vacuum_into(&self, target: &Path) -> BackupResult<()> {
        let target = target.to_string_lossy().into_owned();
        sqlx::query("VACUUM INTO ?")
            .bind(&target)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BackupError::Storage(StorageError::Database {
                    operation: format!("VACUUM INTO {}", target),
                    reason: e.to_string(),
                })
            })?;
        Ok(())
    }

    /// Close every pooled connection, releasing the file handle
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database {} closed", self.path.display());
    }
}
