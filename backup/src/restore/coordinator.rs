// File: backup/src/restore/coordinator.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use super::marker::RestoreMarker;
use crate::archive::extract_payload;
use crate::artifact::{self, ArtifactFormat};
use crate::errors::{BackupError, BackupResult, NotFoundError};
use crate::fsutil::{exists, remove_if_exists, sync_parent_dir};
use crate::layout::{partial_sibling, StoreLayout};
use crate::snapshot::SnapshotEngine;

const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Returned when a restore has been staged; the live store is untouched
/// until the next restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreTicket {
    pub artifact_name: String,
    pub staged_path: PathBuf,
    /// Name of the safety backup, if one could be taken
    pub safety_backup: Option<String>,
    pub staged_at: DateTime<Utc>,
    pub restart_required: bool,
    pub message: String,
}

pub struct RestoreCoordinator {
    layout: StoreLayout,
    snapshot_engine: SnapshotEngine,
    // One restore at a time
    lock: Mutex<()>,
}

impl RestoreCoordinator {
    pub fn new(layout: StoreLayout, snapshot_engine: SnapshotEngine) -> Self {
        Self {
            layout,
            snapshot_engine,
            lock: Mutex::new(()),
        }
    }

    /// Stage the payload of `artifact_name` for activation at next boot.
    ///
    /// Nothing is written when the name is invalid, the artifact is missing
    /// or a restore is already pending.
    #[instrument(skip(self))]
    pub async fn restore(&self, artifact_name: &str) -> BackupResult<RestoreTicket> {
        let _guard = self.lock.lock().await;

        artifact::validate_artifact_name(artifact_name)?;
        let artifact_path = self.layout.artifact_path(artifact_name);
        if !is_regular_file(&artifact_path).await {
            return Err(BackupError::artifact_not_found(artifact_name));
        }

        let marker_path = self.layout.marker_path();
        if let Some(pending) = RestoreMarker::read(&marker_path).await? {
            return Err(BackupError::conflict(format!(
                "restore of '{}' is already pending activation; restart or cancel it first",
                pending.original_artifact_name
            )));
        }

        info!("=== Staging restore from {} ===", artifact_name);

        info!("Step 1: Taking safety backup of current store");
        let safety_backup = self.take_safety_backup().await;

        info!("Step 2: Resolving payload");
        let staged_path = self.layout.staged_path();
        self.stage_payload(artifact_name, &artifact_path, &staged_path)
            .await?;

        info!("Step 3: Writing restore marker");
        let marker = RestoreMarker::new(&staged_path, artifact_name);
        if let Err(e) = marker.write(&marker_path).await {
            error!("✗ Failed to write restore marker: {}", e);
            discard(&staged_path).await;
            return Err(e);
        }

        info!(
            "✓ Restore from {} staged; restart the service to activate it",
            artifact_name
        );

        Ok(RestoreTicket {
            artifact_name: artifact_name.to_string(),
            staged_path,
            safety_backup,
            staged_at: marker.timestamp,
            restart_required: true,
            message: format!(
                "Restore from '{}' staged. Restart the service to complete the restore.",
                artifact_name
            ),
        })
    }

    /// The pending restore, if any
    pub async fn pending(&self) -> BackupResult<Option<RestoreMarker>> {
        RestoreMarker::read(&self.layout.marker_path()).await
    }

    /// Withdraw a staged restore before it is activated
    #[instrument(skip(self))]
    pub async fn cancel(&self) -> BackupResult<RestoreMarker> {
        let _guard = self.lock.lock().await;

        let marker_path = self.layout.marker_path();
        let marker = RestoreMarker::read(&marker_path)
            .await?
            .ok_or(BackupError::NotFound(NotFoundError::PendingRestore))?;

        // Marker first: without it the staged file is inert debris
        remove_if_exists(&marker_path).await?;
        sync_parent_dir(&marker_path).await;
        discard(&self.layout.staged_path()).await;

        info!(
            "✓ Cancelled pending restore of {}",
            marker.original_artifact_name
        );
        Ok(marker)
    }

    /// Snapshot the live store as `pre_restore_<ts>.db`. Failure is logged
    /// and does not abort the restore.
    async fn take_safety_backup(&self) -> Option<String> {
        let name = artifact::safety_backup_name(Utc::now());
        let in_progress = self.layout.in_progress_path(&name);
        let final_path = self.layout.artifact_path(&name);

        let result = async {
            self.snapshot_engine.snapshot(&in_progress).await?;
            tokio::fs::rename(&in_progress, &final_path)
                .await
                .map_err(|e| BackupError::io(format!("publish {}", name), e))?;
            sync_parent_dir(&final_path).await;
            Ok::<(), BackupError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!("✓ Safety backup created: {}", name);
                Some(name)
            }
            Err(e) => {
                warn!("Safety backup failed, continuing with restore: {}", e);
                discard(&in_progress).await;
                None
            }
        }
    }

    /// Copy or extract the payload into the staging slot via a partial file
    async fn stage_payload(
        &self,
        artifact_name: &str,
        artifact_path: &Path,
        staged_path: &Path,
    ) -> BackupResult<()> {
        let partial = partial_sibling(staged_path);
        discard(&partial).await;

        let result = match artifact::classify_format(artifact_name) {
            ArtifactFormat::Snapshot => copy_snapshot(artifact_path, &partial).await,
            ArtifactFormat::Container => {
                self.extract_container(artifact_name, artifact_path, &partial)
                    .await
            }
        };

        let result = match result {
            Ok(()) => verify_sqlite_header(artifact_name, &partial).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            error!("✗ Failed to stage payload from {}: {}", artifact_name, e);
            discard(&partial).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&partial, staged_path).await {
            discard(&partial).await;
            return Err(BackupError::io(
                format!("stage {}", staged_path.display()),
                e,
            ));
        }
        sync_parent_dir(staged_path).await;

        info!("✓ Payload staged at {}", staged_path.display());
        Ok(())
    }

    async fn extract_container(
        &self,
        artifact_name: &str,
        container: &Path,
        destination: &Path,
    ) -> BackupResult<()> {
        let container = container.to_path_buf();
        let destination = destination.to_path_buf();
        let database_file = self.layout.database_file().to_string();
        let entry = database_file.clone();

        let found = tokio::task::spawn_blocking(move || {
            extract_payload(&container, &database_file, &destination)
        })
        .await
        .map_err(|e| BackupError::io("extract payload", e))?
        .map_err(|e| BackupError::io(format!("extract payload from {}", artifact_name), e))?;

        if !found {
            return Err(BackupError::NotFound(NotFoundError::PayloadEntry {
                artifact: artifact_name.to_string(),
                entry,
            }));
        }
        Ok(())
    }
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

async fn copy_snapshot(source: &Path, destination: &Path) -> BackupResult<()> {
    tokio::fs::copy(source, destination)
        .await
        .map_err(|e| BackupError::io(format!("copy {}", source.display()), e))?;
    let file = tokio::fs::File::open(destination)
        .await
        .map_err(|e| BackupError::io(format!("open {}", destination.display()), e))?;
    file.sync_all()
        .await
        .map_err(|e| BackupError::io(format!("sync {}", destination.display()), e))
}

/// Refuse payloads that SQLite would not open
async fn verify_sqlite_header(artifact_name: &str, path: &Path) -> BackupResult<()> {
    let mut header = [0u8; 16];
    let read = async {
        let mut file = tokio::fs::File::open(path).await?;
        file.read_exact(&mut header).await
    }
    .await;

    match read {
        Ok(_) if &header == SQLITE_HEADER => Ok(()),
        Ok(_) => Err(BackupError::invalid_name(
            artifact_name,
            "payload is not a SQLite database",
        )),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(
            BackupError::invalid_name(artifact_name, "payload is too short to be a SQLite database"),
        ),
        Err(e) => Err(BackupError::io(format!("read {}", path.display()), e)),
    }
}

async fn discard(path: &Path) {
    if !exists(path).await {
        return;
    }
    if let Err(e) = remove_if_exists(path).await {
        warn!("Could not remove {}: {}", path.display(), e);
    }
}
