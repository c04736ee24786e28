pub mod archive;
pub mod artifact;
pub mod config;
pub mod constants;
pub mod database;
pub mod errors;
pub mod fsutil;
pub mod layout;
pub mod restore;
pub mod retention;
pub mod scheduler;
pub mod services;
pub mod snapshot;

// Re-export commonly used types
pub use archive::ArchiveBuilder;
pub use artifact::{ArtifactFormat, BackupArtifact, BackupOrigin, BackupScope};
pub use config::{Config, ConfigManager};
pub use database::{AuditSink, Database, SettingsStore};
pub use errors::{BackupError, BackupResult};
pub use layout::StoreLayout;
pub use restore::{apply_pending_restore, RecoveryOutcome, RestoreCoordinator, RestoreTicket};
pub use retention::{RetentionManager, RetentionReport};
pub use scheduler::{AutoBackupConfig, BackupScheduler, SchedulerState};
pub use services::{BackupService, BackupStats};
pub use snapshot::SnapshotEngine;
