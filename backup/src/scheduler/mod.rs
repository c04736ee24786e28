//! Interval-based scheduling for automatic backups
//!
//! This module drives one backup attempt (snapshot, container, retention) per
//! configured interval.
//!
//! # Features
//!
//! - **Owned timer**: each `BackupScheduler` owns its timer task; nothing is
//!   process-global, so tests and multi-tenant hosts can run several
//! - **Replace, never stack**: `start` aborts the previous timer before
//!   installing a new one and restarts the interval from zero
//! - **Single-slot guard**: a tick that fires while the previous one is still
//!   running is skipped, not queued
//! - **Graceful stop**: `stop` only cancels the timer; a tick in flight runs
//!   to completion
//!
//! # Configuration
//!
//! The auto-backup configuration lives in the store's key-value settings:
//!
//! ```text
//! backup_enabled        = "true"
//! backup_interval_hours = "24"
//! backup_scope          = "full"
//! backup_retention_cap  = "7"      # 0 = unlimited
//! ```

pub mod operations;
pub use operations::{BackupScheduler, SchedulerStats, TickJob};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::artifact::BackupScope;
use crate::constants::settings as keys;
use crate::database::SettingsStore;
use crate::errors::{BackupError, BackupResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutoBackupConfig {
    pub enabled: bool,
    pub interval_hours: u32,
    pub scope: BackupScope,
    /// Maximum number of artifacts kept; 0 = unlimited
    pub retention_cap: u32,
}

impl AutoBackupConfig {
    pub fn validate(&self) -> BackupResult<()> {
        if self.interval_hours == 0 {
            return Err(BackupError::invalid_config(
                keys::BACKUP_INTERVAL_HOURS,
                "interval must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_hours) * 3600)
    }

    /// Read the persisted config, falling back to `defaults` for missing or
    /// unreadable keys.
    pub async fn load(
        settings: &dyn SettingsStore,
        defaults: &AutoBackupConfig,
    ) -> BackupResult<Self> {
        let enabled = read_key(settings, keys::BACKUP_ENABLED, defaults.enabled, |v| {
            v.parse::<bool>().ok()
        })
        .await?;
        let interval_hours = read_key(
            settings,
            keys::BACKUP_INTERVAL_HOURS,
            defaults.interval_hours,
            |v| v.parse::<u32>().ok().filter(|hours| *hours > 0),
        )
        .await?;
        let scope = read_key(settings, keys::BACKUP_SCOPE, defaults.scope, |v| {
            v.parse::<BackupScope>().ok()
        })
        .await?;
        let retention_cap = read_key(
            settings,
            keys::BACKUP_RETENTION_CAP,
            defaults.retention_cap,
            |v| v.parse::<u32>().ok(),
        )
        .await?;

        Ok(Self {
            enabled,
            interval_hours,
            scope,
            retention_cap,
        })
    }

    /// Validate and persist every key
    pub async fn save(&self, settings: &dyn SettingsStore) -> BackupResult<()> {
        self.validate()?;
        settings
            .set_setting(keys::BACKUP_ENABLED, &self.enabled.to_string())
            .await?;
        settings
            .set_setting(keys::BACKUP_INTERVAL_HOURS, &self.interval_hours.to_string())
            .await?;
        settings
            .set_setting(keys::BACKUP_SCOPE, self.scope.as_str())
            .await?;
        settings
            .set_setting(keys::BACKUP_RETENTION_CAP, &self.retention_cap.to_string())
            .await?;
        Ok(())
    }
}

async fn read_key<T, F>(
    settings: &dyn SettingsStore,
    key: &str,
    default: T,
    parse: F,
) -> BackupResult<T>
where
    F: Fn(&str) -> Option<T>,
{
    match settings.get_setting(key).await? {
        None => Ok(default),
        Some(raw) => match parse(raw.trim()) {
            Some(value) => Ok(value),
            None => {
                warn!("Ignoring unreadable setting {}='{}', using default", key, raw);
                Ok(default)
            }
        },
    }
}
