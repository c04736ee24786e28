// File: backup/src/restore/recovery.rs
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::marker::RestoreMarker;
use crate::constants::store::SIDECAR_SUFFIXES;
use crate::fsutil::{remove_if_exists_sync, sync_dir};
use crate::layout::{with_suffix, StoreLayout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No marker: boot normally
    NoPendingRestore,
    /// Staged payload is now the live store
    Applied {
        artifact_name: String,
        /// Where the replaced store went, if there was one
        previous_generation: Option<PathBuf>,
    },
    /// Marker pointed at a payload that no longer exists
    StagedPayloadMissing { artifact_name: String },
    /// Marker unreadable or the swap failed; the current store is kept
    Failed { reason: String },
}

/// Activate a pending restore. Must run before the live store is opened.
///
/// Never fails the boot: every problem is logged and reported in the
/// outcome. The marker is gone afterwards, whatever the outcome.
pub fn apply_pending_restore(layout: &StoreLayout) -> RecoveryOutcome {
    let marker_path = layout.marker_path();

    let marker = match RestoreMarker::read_sync(&marker_path) {
        Ok(Some(marker)) => marker,
        Ok(None) => return RecoveryOutcome::NoPendingRestore,
        Err(e) => {
            error!("✗ Restore marker is unreadable, ignoring it: {}", e);
            clear_marker(&marker_path);
            return RecoveryOutcome::Failed {
                reason: format!("unreadable restore marker: {}", e),
            };
        }
    };

    info!(
        "=== Applying pending restore from {} ===",
        marker.original_artifact_name
    );

    let outcome = activate(layout, &marker);
    clear_marker(&marker_path);

    match &outcome {
        RecoveryOutcome::Applied {
            artifact_name,
            previous_generation,
        } => {
            info!("✓ Restore from {} applied", artifact_name);
            if let Some(previous) = previous_generation {
                info!("Previous store kept at {}", previous.display());
            }
        }
        RecoveryOutcome::StagedPayloadMissing { artifact_name } => {
            error!(
                "✗ Staged payload for {} is missing, keeping current store",
                artifact_name
            );
        }
        RecoveryOutcome::Failed { reason } => {
            error!("✗ Restore failed, keeping current store: {}", reason);
        }
        RecoveryOutcome::NoPendingRestore => {}
    }

    outcome
}

fn activate(layout: &StoreLayout, marker: &RestoreMarker) -> RecoveryOutcome {
    let staged = layout.staged_path();
    if marker.staged_path != staged {
        return RecoveryOutcome::Failed {
            reason: format!(
                "marker points at {}, expected {}",
                marker.staged_path.display(),
                staged.display()
            ),
        };
    }

    if !staged.is_file() {
        return RecoveryOutcome::StagedPayloadMissing {
            artifact_name: marker.original_artifact_name.clone(),
        };
    }

    let live = layout.database_path();
    let previous = layout.previous_generation_path();
    let had_live = live.exists();

    info!("Step 1: Moving current store to previous generation");
    if had_live {
        if let Err(e) = retire_live(&live, &previous) {
            rollback(&live, &previous);
            return RecoveryOutcome::Failed {
                reason: format!("could not move current store aside: {}", e),
            };
        }
    } else if let Err(e) = retire_stray_sidecars(&live, &previous) {
        return RecoveryOutcome::Failed {
            reason: format!("could not clear sidecars of the old store: {}", e),
        };
    }

    info!("Step 2: Activating staged payload");
    if let Err(e) = fs::rename(&staged, &live) {
        rollback(&live, &previous);
        return RecoveryOutcome::Failed {
            reason: format!("could not activate staged payload: {}", e),
        };
    }

    if let Err(e) = sync_dir(layout.data_dir()) {
        warn!("Data directory sync skipped: {}", e);
    }

    RecoveryOutcome::Applied {
        artifact_name: marker.original_artifact_name.clone(),
        previous_generation: previous.exists().then_some(previous),
    }
}

/// Replace the single previous generation with the current store and its
/// sidecars.
///
/// Sidecars move before the main file, so a live store is never left
/// without its own WAL and the payload never lands next to a stale one.
/// A previous generation with sidecars but no main file is the remains of
/// an interrupted earlier run: those sidecars belong to the live store.
fn retire_live(live: &Path, previous: &Path) -> io::Result<()> {
    if previous.exists() {
        for suffix in SIDECAR_SUFFIXES {
            remove_if_exists_sync(&with_suffix(previous, suffix))?;
        }
        fs::remove_file(previous)?;
    }

    move_sidecars(live, previous)?;
    fs::rename(live, previous)
}

/// Sidecars still at the live path while the main file is gone belong to
/// the store that was moved aside; they must not meet the payload.
fn retire_stray_sidecars(live: &Path, previous: &Path) -> io::Result<()> {
    for suffix in SIDECAR_SUFFIXES {
        let sidecar = with_suffix(live, suffix);
        if !sidecar.exists() {
            continue;
        }

        let target = with_suffix(previous, suffix);
        if previous.exists() && !target.exists() {
            warn!("Moving stray {} to {}", sidecar.display(), target.display());
            fs::rename(&sidecar, &target)?;
        } else {
            warn!("Deleting stray {}", sidecar.display());
            fs::remove_file(&sidecar)?;
        }
    }
    Ok(())
}

fn move_sidecars(from: &Path, to: &Path) -> io::Result<()> {
    for suffix in SIDECAR_SUFFIXES {
        let sidecar = with_suffix(from, suffix);
        if sidecar.exists() {
            fs::rename(&sidecar, with_suffix(to, suffix))?;
        }
    }
    Ok(())
}

/// Put the previous generation back when activation stopped halfway
fn rollback(live: &Path, previous: &Path) {
    if live.exists() || !previous.exists() {
        return;
    }

    warn!("Rolling back to {}", previous.display());
    if let Err(e) = move_sidecars(previous, live) {
        warn!("Could not roll back sidecars of {}: {}", previous.display(), e);
    }
    if let Err(e) = fs::rename(previous, live) {
        error!("✗ Rollback failed: {}", e);
    }
}

fn clear_marker(marker_path: &Path) {
    if let Err(e) = remove_if_exists_sync(marker_path) {
        error!(
            "✗ Could not delete restore marker {}: {}",
            marker_path.display(),
            e
        );
    }
}
