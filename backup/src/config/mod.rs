// File: backup/src/config/mod.rs
pub mod manager;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
pub use manager::ConfigManager;

use crate::artifact::BackupScope;
use crate::constants::defaults;
use crate::layout::StoreLayout;
use crate::scheduler::AutoBackupConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the live store, the marker and the staged payload
    pub data_dir: PathBuf,
    /// File name of the live store inside `data_dir`
    pub database_file: String,
    /// Flat directory receiving every backup artifact
    pub backup_dir: PathBuf,
    /// Extra trees packed into full-scope containers
    #[serde(default)]
    pub auxiliary_sources: Vec<AuxiliarySource>,
    /// Fallback for any auto-backup setting not yet persisted
    #[serde(default)]
    pub auto_backup: AutoBackupDefaults,
}

/// One location packed into full-scope containers.
///
/// Missing locations are skipped when a container is built, so the list can
/// name trees that only exist on some deployments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuxiliarySource {
    pub path: PathBuf,
    /// Top-level name of this source inside the container
    pub archive_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoBackupDefaults {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,
    #[serde(default)]
    pub scope: BackupScope,
    #[serde(default = "default_retention_cap")]
    pub retention_cap: u32,
}

fn default_enabled() -> bool {
    defaults::AUTO_BACKUP_ENABLED
}

fn default_interval_hours() -> u32 {
    defaults::INTERVAL_HOURS
}

fn default_retention_cap() -> u32 {
    defaults::RETENTION_CAP
}

impl Default for AutoBackupDefaults {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_hours: default_interval_hours(),
            scope: BackupScope::default(),
            retention_cap: default_retention_cap(),
        }
    }
}

impl From<&AutoBackupDefaults> for AutoBackupConfig {
    fn from(defaults: &AutoBackupDefaults) -> Self {
        AutoBackupConfig {
            enabled: defaults.enabled,
            interval_hours: defaults.interval_hours,
            scope: defaults.scope,
            retention_cap: defaults.retention_cap,
        }
    }
}

impl Config {
    pub fn layout(&self) -> StoreLayout {
        StoreLayout::new(&self.data_dir, &self.database_file, &self.backup_dir)
    }
}
