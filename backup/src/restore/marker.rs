// File: backup/src/restore/marker.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{BackupError, BackupResult};
use crate::fsutil::publish;

/// Persisted flag for a pending restore; consumed once at the next boot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestoreMarker {
    pub staged_path: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub original_artifact_name: String,
}

impl RestoreMarker {
    pub fn new(staged_path: impl Into<PathBuf>, original_artifact_name: &str) -> Self {
        Self {
            staged_path: staged_path.into(),
            timestamp: Utc::now(),
            original_artifact_name: original_artifact_name.to_string(),
        }
    }

    /// Read the marker at `path`; `None` when no restore is pending
    pub async fn read(path: &Path) -> BackupResult<Option<Self>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackupError::io(format!("read {}", path.display()), e)),
        }
    }

    /// Blocking read used by startup recovery
    pub fn read_sync(path: &Path) -> anyhow::Result<Option<Self>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically write the marker to `path`
    pub async fn write(&self, path: &Path) -> BackupResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        publish(path, &json).await
    }
}
