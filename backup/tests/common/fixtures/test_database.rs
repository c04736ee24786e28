//! File-backed test stores
//!
//! Snapshots need a real file (`VACUUM INTO` does not work the same way on
//! an in-memory database), so every test store lives in a temp directory.

use std::path::Path;
use std::sync::Arc;

use sqlx::Row;
use tempfile::TempDir;

use backup::config::Config;
use backup::{apply_pending_restore, BackupService, Database, RecoveryOutcome, StoreLayout};

use super::TestConfigBuilder;

/// Live store with a small `notes` domain table
pub struct TestStore {
    pub database: Arc<Database>,
}

impl TestStore {
    pub async fn open(path: &Path) -> Self {
        let database = Database::new(path).await.expect("Failed to open store");
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS notes (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT NOT NULL)",
        )
        .execute(database.pool())
        .await
        .expect("Failed to create notes table");

        Self {
            database: Arc::new(database),
        }
    }

    pub async fn insert_note(&self, body: &str) {
        sqlx::query("INSERT INTO notes (body) VALUES (?)")
            .bind(body)
            .execute(self.database.pool())
            .await
            .expect("Failed to insert note");
    }

    pub async fn notes(&self) -> Vec<String> {
        sqlx::query("SELECT body FROM notes ORDER BY id")
            .fetch_all(self.database.pool())
            .await
            .expect("Failed to read notes")
            .iter()
            .map(|row| row.get::<String, _>("body"))
            .collect()
    }
}

/// Temp directory, live store and service wired together
pub struct TestWorkspace {
    pub dir: TempDir,
    pub config: Config,
    pub store: TestStore,
    pub service: BackupService,
}

impl TestWorkspace {
    pub async fn new() -> Self {
        Self::with_config(|builder| builder).await
    }

    pub async fn with_config<F>(configure: F) -> Self
    where
        F: FnOnce(TestConfigBuilder) -> TestConfigBuilder,
    {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = configure(TestConfigBuilder::new(dir.path())).build();
        std::fs::create_dir_all(&config.backup_dir).expect("Failed to create backup dir");

        let store = TestStore::open(&config.layout().database_path()).await;
        let service = BackupService::new(&config, store.database.clone());

        Self {
            dir,
            config,
            store,
            service,
        }
    }

    pub fn layout(&self) -> StoreLayout {
        self.config.layout()
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Simulate a process restart: close the store, run startup recovery,
    /// reopen everything
    pub async fn restart(&mut self) -> RecoveryOutcome {
        self.restart_with(|_| {}).await
    }

    /// Like `restart`, with `interrupt` applied to the files between the
    /// shutdown and recovery, to stand in for a crash mid-activation
    pub async fn restart_with<F>(&mut self, interrupt: F) -> RecoveryOutcome
    where
        F: FnOnce(&StoreLayout),
    {
        self.service.stop_scheduler();
        self.store.database.close().await;
        interrupt(&self.layout());

        let outcome = apply_pending_restore(&self.layout());

        self.store = TestStore::open(&self.layout().database_path()).await;
        self.service = BackupService::new(&self.config, self.store.database.clone());
        outcome
    }
}
