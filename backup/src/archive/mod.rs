// File: backup/src/archive/mod.rs

//! Compressed backup containers
//!
//! A container is a gzip-compressed tar archive. Layout:
//!
//! ```text
//! data/<store file>        consistent snapshot of the live store (always)
//! <archive_name>/...       one tree per present auxiliary source (full only)
//! RESTORE_GUIDE.md         generated restore instructions (full only)
//! ```
//!
//! Containers are assembled under an in-progress name and renamed into place
//! only after the gzip stream is finished and the file is synced, so listing
//! and retention never see a truncated container.

pub mod builder;
pub mod extract;
pub mod guide;

pub use builder::ArchiveBuilder;
pub use extract::{extract_payload, list_entries};
