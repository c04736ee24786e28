//! Central repository for file names, prefixes, setting keys and defaults
//!
//! Everything that shows up on disk or in the settings table is named here so
//! that the writer (backup, restore) and the reader (listing, retention,
//! startup recovery) can never drift apart.

/// Artifact naming convention
pub mod naming {
    /// Prefix for artifacts still being written; never listed, never retained
    pub const IN_PROGRESS_PREFIX: &str = ".partial-";

    /// Prefix for manually requested backups
    pub const MANUAL_PREFIX: &str = "backup";

    /// Prefix for scheduled backups
    pub const SCHEDULED_PREFIX: &str = "auto";

    /// Prefix for the safety backup taken before staging a restore
    pub const SAFETY_PREFIX: &str = "pre_restore";

    /// Marker substring that classifies an artifact as full scope
    pub const FULL_MARKER: &str = "_full_";

    /// Timestamp layout embedded in artifact names (UTC, lexically sortable)
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

    /// Container extension
    pub const CONTAINER_EXTENSION: &str = ".tar.gz";

    /// Raw snapshot extensions
    pub const SNAPSHOT_EXTENSIONS: &[&str] = &[".db", ".sqlite"];

    /// Longest accepted artifact name
    pub const MAX_NAME_LENGTH: usize = 255;
}

/// Layout inside a container
pub mod archive {
    /// Directory holding the store snapshot inside a container
    pub const DATA_DIR: &str = "data";

    /// Generated restore instructions, full scope only
    pub const RESTORE_GUIDE: &str = "RESTORE_GUIDE.md";

    /// Gzip level used for containers
    pub const COMPRESSION_LEVEL: u32 = 6;
}

/// Files living next to the live store
pub mod store {
    /// Marker signalling a pending deferred restore
    pub const RESTORE_MARKER: &str = "restore_pending.json";

    /// Suffix of the staged payload awaiting activation
    pub const STAGED_SUFFIX: &str = ".restore-staged";

    /// Suffix of the single previous-generation copy
    pub const PREVIOUS_SUFFIX: &str = ".previous";

    /// Suffix for files being written before their atomic rename
    pub const PARTIAL_SUFFIX: &str = ".partial";

    /// SQLite sidecar files that belong to the main database file
    pub const SIDECAR_SUFFIXES: &[&str] = &["-wal", "-shm"];
}

/// Keys in the key-value settings table
pub mod settings {
    pub const BACKUP_ENABLED: &str = "backup_enabled";
    pub const BACKUP_INTERVAL_HOURS: &str = "backup_interval_hours";
    pub const BACKUP_SCOPE: &str = "backup_scope";
    pub const BACKUP_RETENTION_CAP: &str = "backup_retention_cap";
}

/// Audit vocabulary
pub mod audit {
    pub const ENTITY_BACKUP: &str = "backup";

    pub const ACTION_MANUAL_BACKUP: &str = "manual_backup";
    pub const ACTION_SCHEDULED_BACKUP: &str = "scheduled_backup";
    pub const ACTION_DELETE_BACKUP: &str = "delete_backup";
    pub const ACTION_RETENTION_SWEEP: &str = "retention_sweep";
    pub const ACTION_RESTORE_STAGED: &str = "restore_staged";
    pub const ACTION_RESTORE_CANCELLED: &str = "restore_cancelled";
    pub const ACTION_AUTO_BACKUP_CONFIG: &str = "auto_backup_config";
}

/// Default configuration values
pub mod defaults {
    /// Auto backup is off until an operator enables it
    pub const AUTO_BACKUP_ENABLED: bool = false;

    /// Default cadence for scheduled backups
    pub const INTERVAL_HOURS: u32 = 24;

    /// Default number of artifacts kept on disk
    pub const RETENTION_CAP: u32 = 7;

    /// Default config directory for the daemon
    pub const CONFIG_DIR: &str = "config";
}
