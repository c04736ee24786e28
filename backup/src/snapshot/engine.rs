// File: backup/src/snapshot/engine.rs
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::database::Database;
use crate::errors::{BackupError, BackupResult};
use crate::fsutil::{exists, remove_if_exists};

#[derive(Clone)]
pub struct SnapshotEngine {
    database: Arc<Database>,
}

impl SnapshotEngine {
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Write a consistent copy of the live store to `target_path`.
    ///
    /// Returns the size of the copy. On failure no file is left at
    /// `target_path`.
    #[instrument(skip(self), fields(target = %target_path.display()))]
    pub async fn snapshot(&self, target_path: &Path) -> BackupResult<u64> {
        if let Some(parent) = target_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BackupError::io(format!("create {}", parent.display()), e))?;
        }

        // VACUUM INTO refuses to overwrite; anything here is debris from a crash
        if exists(target_path).await {
            warn!("Removing stale snapshot file {}", target_path.display());
            remove_if_exists(target_path).await?;
        }

        if let Err(e) = self.database.vacuum_into(target_path).await {
            error!("✗ Snapshot to {} failed: {}", target_path.display(), e);
            if let Err(cleanup) = remove_if_exists(target_path).await {
                warn!(
                    "Could not remove partial snapshot {}: {}",
                    target_path.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        let size_bytes = match tokio::fs::metadata(target_path).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                let _ = remove_if_exists(target_path).await;
                return Err(BackupError::io(
                    format!("stat snapshot {}", target_path.display()),
                    e,
                ));
            }
        };

        info!(
            "✓ Snapshot written to {} ({:.1} KB)",
            target_path.display(),
            size_bytes as f64 / 1024.0
        );
        Ok(size_bytes)
    }
}
