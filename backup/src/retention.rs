//! Retention: bound the number of artifacts kept in the backup directory.
//!
//! Given a cap `n > 0`, the `n` newest artifacts by modification time survive
//! and everything older is deleted, oldest first. A cap of zero means
//! unlimited. In-progress files are invisible here, so a sweep can never
//! delete a container that is still being written.

use std::path::PathBuf;
use tracing::{info, instrument, warn};

use crate::artifact::{list_artifacts, BackupArtifact};
use crate::errors::BackupResult;
use crate::fsutil::remove_if_exists;

#[derive(Debug, Clone)]
pub struct RetentionManager {
    backup_dir: PathBuf,
}

/// Result of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

impl RetentionManager {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    /// Delete every artifact beyond the `cap` newest.
    ///
    /// A failure to delete one artifact is logged and recorded in the report;
    /// the sweep carries on with the rest.
    #[instrument(skip(self))]
    pub async fn enforce(&self, cap: i64) -> BackupResult<RetentionReport> {
        let artifacts = list_artifacts(&self.backup_dir).await?;

        if cap <= 0 {
            info!("Retention unlimited, keeping all {} backups", artifacts.len());
            return Ok(RetentionReport {
                kept: names(&artifacts),
                ..Default::default()
            });
        }

        let cap = cap as usize;
        if artifacts.len() <= cap {
            info!(
                "No old backups to clean up (have {}, keeping {})",
                artifacts.len(),
                cap
            );
            return Ok(RetentionReport {
                kept: names(&artifacts),
                ..Default::default()
            });
        }

        let (keep, expired) = artifacts.split_at(cap);
        info!(
            "Cleaning up {} old backups (keeping {} most recent)",
            expired.len(),
            cap
        );

        let mut report = RetentionReport {
            kept: names(keep),
            ..Default::default()
        };

        // Oldest first
        for artifact in expired.iter().rev() {
            let path = self.backup_dir.join(&artifact.name);
            match remove_if_exists(&path).await {
                Ok(()) => {
                    info!("Deleted old backup: {}", artifact.name);
                    report.deleted.push(artifact.name.clone());
                }
                Err(e) => {
                    warn!("Failed to delete backup {}: {}", artifact.name, e);
                    report.failed.push(artifact.name.clone());
                }
            }
        }

        info!(
            "Retention sweep finished: {} deleted, {} failed",
            report.deleted.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

fn names(artifacts: &[BackupArtifact]) -> Vec<String> {
    artifacts.iter().map(|a| a.name.clone()).collect()
}
