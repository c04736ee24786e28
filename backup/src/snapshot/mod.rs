// File: backup/src/snapshot/mod.rs

//! Consistent point-in-time copies of the live store
//!
//! A snapshot is taken with the store's own online-copy primitive rather than
//! a raw file copy, so a snapshot taken while requests are writing is still a
//! valid, independently openable database.
//!
//! # Snapshot Process
//!
//! 1. Remove any stale file left at the target by an earlier crash
//! 2. `VACUUM INTO` the target path
//! 3. On failure, delete whatever the copy left behind

pub mod engine;

pub use engine::SnapshotEngine;
