// File: backup/src/services/mod.rs

pub mod backup_service;

pub use backup_service::{BackupService, BackupStats};
