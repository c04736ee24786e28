// File: backup/src/restore/mod.rs

//! Deferred, restart-time restore
//!
//! The running process holds the live store open, so a restore can never
//! swap the file in place. It is split into two phases instead:
//!
//! # Phase 1: staging (`RestoreCoordinator`, while the service runs)
//!
//! 1. Validate the artifact name and check the artifact exists
//! 2. Refuse if another restore is already pending
//! 3. **Safety backup** of the current store (best effort)
//! 4. Extract or copy the payload into `<store>.restore-staged`
//! 5. Write the marker `restore_pending.json`
//!
//! # Phase 2: activation (`apply_pending_restore`, at boot, before the store opens)
//!
//! 1. No marker: normal boot
//! 2. Staged payload gone: drop the marker, keep the current store
//! 3. Current store (and its `-wal`/`-shm`) becomes `<store>.previous`
//! 4. Staged payload becomes the store
//! 5. Marker is deleted, whatever happened above
//!
//! The marker is the only signal of a pending restore. Each file involved is
//! produced by write-then-rename, so a crash at any point leaves either the
//! old or the new state intact.

pub mod coordinator;
pub mod marker;
pub mod recovery;

pub use coordinator::{RestoreCoordinator, RestoreTicket};
pub use marker::RestoreMarker;
pub use recovery::{apply_pending_restore, RecoveryOutcome};
