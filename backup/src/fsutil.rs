//! Small filesystem helpers shared by the write paths.
//!
//! Every state change that must be observed atomically goes through
//! [`publish`]: the bytes are fully written and synced under a temporary name
//! first, then renamed into place, then the directory entry is synced.

use std::path::Path;
use tracing::{debug, warn};

use crate::errors::{BackupError, BackupResult};
use crate::layout::partial_sibling;

/// Remove a file, treating "already gone" as success
pub async fn remove_if_exists(path: &Path) -> BackupResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BackupError::io(format!("remove {}", path.display()), e)),
    }
}

/// Blocking variant of [`remove_if_exists`] for startup recovery
pub fn remove_if_exists_sync(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

pub async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Write `contents` to `path` atomically (temporary sibling, fsync, rename)
pub async fn publish(path: &Path, contents: &[u8]) -> BackupResult<()> {
    let partial = partial_sibling(path);
    let result: std::io::Result<()> = async {
        let mut file = tokio::fs::File::create(&partial).await?;
        tokio::io::AsyncWriteExt::write_all(&mut file, contents).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&partial, path).await
    }
    .await;

    if let Err(e) = result {
        if let Err(cleanup) = remove_if_exists(&partial).await {
            warn!("Could not remove {}: {}", partial.display(), cleanup);
        }
        return Err(BackupError::io(format!("write {}", path.display()), e));
    }

    sync_parent_dir(path).await;
    Ok(())
}

/// Persist a rename by syncing the containing directory (best effort)
pub async fn sync_parent_dir(path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };
    let parent = parent.to_path_buf();
    let result = tokio::task::spawn_blocking(move || sync_dir(&parent)).await;
    if let Ok(Err(e)) = result {
        debug!("Directory sync skipped: {}", e);
    }
}

/// Blocking directory sync; not every platform allows opening a directory
pub fn sync_dir(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        std::fs::File::open(dir)?.sync_all()
    }
    #[cfg(not(unix))]
    {
        let _ = dir;
        Ok(())
    }
}
