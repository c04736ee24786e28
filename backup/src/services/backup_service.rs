// File: backup/src/services/backup_service.rs
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::archive::ArchiveBuilder;
use crate::artifact::{self, BackupArtifact, BackupOrigin, BackupScope};
use crate::config::Config;
use crate::constants::audit;
use crate::database::{AuditRecord, AuditSink, Database, SettingsStore};
use crate::errors::{BackupError, BackupResult};
use crate::fsutil::{remove_if_exists, sync_parent_dir};
use crate::layout::StoreLayout;
use crate::restore::{RestoreCoordinator, RestoreMarker, RestoreTicket};
use crate::retention::RetentionManager;
use crate::scheduler::{AutoBackupConfig, BackupScheduler, SchedulerState, SchedulerStats, TickJob};
use crate::snapshot::SnapshotEngine;

/// Aggregate view of the backup directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupStats {
    pub total_backups: usize,
    pub total_size_bytes: u64,
    pub by_kind: HashMap<String, usize>,
    pub oldest_backup: Option<DateTime<Utc>>,
    pub newest_backup: Option<DateTime<Utc>>,
    pub restore_pending: bool,
    pub scheduler_state: SchedulerState,
    pub scheduler: SchedulerStats,
}

/// Caller-facing surface of the backup subsystem
pub struct BackupService {
    layout: StoreLayout,
    archive_builder: ArchiveBuilder,
    retention: RetentionManager,
    restore: RestoreCoordinator,
    scheduler: BackupScheduler,
    settings: Arc<dyn SettingsStore>,
    audit: Arc<dyn AuditSink>,
    defaults: AutoBackupConfig,
}

impl BackupService {
    /// Wire the service against `database` for snapshots, settings and audit
    pub fn new(config: &Config, database: Arc<Database>) -> Self {
        let settings: Arc<dyn SettingsStore> = database.clone();
        let audit: Arc<dyn AuditSink> = database.clone();
        Self::with_collaborators(config, database, settings, audit)
    }

    /// Like `new`, with settings and audit supplied separately
    pub fn with_collaborators(
        config: &Config,
        database: Arc<Database>,
        settings: Arc<dyn SettingsStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let layout = config.layout();
        let snapshot_engine = SnapshotEngine::new(database);
        let archive_builder = ArchiveBuilder::new(
            snapshot_engine.clone(),
            layout.clone(),
            config.auxiliary_sources.clone(),
        );
        let retention = RetentionManager::new(layout.backup_dir());
        let restore = RestoreCoordinator::new(layout.clone(), snapshot_engine);
        let scheduler = BackupScheduler::new(scheduled_backup_job(
            archive_builder.clone(),
            retention.clone(),
            audit.clone(),
        ));

        Self {
            layout,
            archive_builder,
            retention,
            restore,
            scheduler,
            settings,
            audit,
            defaults: AutoBackupConfig::from(&config.auto_backup),
        }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Produce a manual container of the given scope
    #[instrument(skip(self))]
    pub async fn create_backup(&self, scope: BackupScope) -> BackupResult<BackupArtifact> {
        info!("Creating manual {} backup", scope);
        let artifact = self
            .archive_builder
            .build_next(BackupOrigin::Manual, scope)
            .await?;

        record(
            self.audit.as_ref(),
            audit::ACTION_MANUAL_BACKUP,
            json!({
                "artifact": artifact.name,
                "scope": scope,
                "size_bytes": artifact.size_bytes,
            }),
        )
        .await;

        Ok(artifact)
    }

    pub async fn list_backups(&self) -> BackupResult<Vec<BackupArtifact>> {
        artifact::list_artifacts(self.layout.backup_dir()).await
    }

    #[instrument(skip(self))]
    pub async fn delete_backup(&self, name: &str) -> BackupResult<()> {
        artifact::validate_artifact_name(name)?;

        let path = self.layout.artifact_path(name);
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(BackupError::artifact_not_found(name));
        }

        remove_if_exists(&path).await?;
        sync_parent_dir(&path).await;
        info!("✓ Deleted backup {}", name);

        record(
            self.audit.as_ref(),
            audit::ACTION_DELETE_BACKUP,
            json!({ "artifact": name }),
        )
        .await;
        Ok(())
    }

    /// Stage a restore from `name`; it takes effect at the next restart
    #[instrument(skip(self))]
    pub async fn restore_from_backup(&self, name: &str) -> BackupResult<RestoreTicket> {
        let ticket = self.restore.restore(name).await?;

        record(
            self.audit.as_ref(),
            audit::ACTION_RESTORE_STAGED,
            json!({
                "artifact": ticket.artifact_name,
                "safety_backup": ticket.safety_backup,
            }),
        )
        .await;

        Ok(ticket)
    }

    pub async fn pending_restore(&self) -> BackupResult<Option<RestoreMarker>> {
        self.restore.pending().await
    }

    pub async fn cancel_pending_restore(&self) -> BackupResult<RestoreMarker> {
        let marker = self.restore.cancel().await?;
        record(
            self.audit.as_ref(),
            audit::ACTION_RESTORE_CANCELLED,
            json!({ "artifact": marker.original_artifact_name }),
        )
        .await;
        Ok(marker)
    }

    pub async fn get_auto_backup_config(&self) -> BackupResult<AutoBackupConfig> {
        AutoBackupConfig::load(self.settings.as_ref(), &self.defaults).await
    }

    /// Persist `config` and reschedule; a disabled config stops the timer
    #[instrument(skip(self))]
    pub async fn set_auto_backup_config(&self, config: AutoBackupConfig) -> BackupResult<()> {
        config.validate()?;
        config.save(self.settings.as_ref()).await?;
        self.scheduler.start(config)?;

        record(
            self.audit.as_ref(),
            audit::ACTION_AUTO_BACKUP_CONFIG,
            json!(config),
        )
        .await;
        Ok(())
    }

    /// Run one scheduled-style backup immediately.
    ///
    /// Shares the scheduler's slot: fails with `Conflict` while a tick runs.
    #[instrument(skip(self))]
    pub async fn trigger_backup_now(&self) -> BackupResult<BackupArtifact> {
        let _permit = self
            .scheduler
            .try_acquire_slot()
            .ok_or_else(|| BackupError::conflict("a backup is already running"))?;

        let config = self.get_auto_backup_config().await?;
        run_backup(
            &self.archive_builder,
            &self.retention,
            self.audit.as_ref(),
            BackupOrigin::Manual,
            config,
        )
        .await
    }

    /// Start the scheduler from the persisted settings
    pub async fn start_auto_backup_from_settings(&self) -> BackupResult<AutoBackupConfig> {
        let config = self.get_auto_backup_config().await?;
        self.scheduler.start(config)?;
        Ok(config)
    }

    pub fn scheduler(&self) -> &BackupScheduler {
        &self.scheduler
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn stop_scheduler(&self) {
        self.scheduler.stop();
    }

    pub async fn get_backup_stats(&self) -> BackupResult<BackupStats> {
        let artifacts = self.list_backups().await?;

        let mut by_kind = HashMap::new();
        for artifact in &artifacts {
            *by_kind.entry(artifact.kind.to_string()).or_insert(0) += 1;
        }

        Ok(BackupStats {
            total_backups: artifacts.len(),
            total_size_bytes: artifacts.iter().map(|a| a.size_bytes).sum(),
            by_kind,
            oldest_backup: artifacts.iter().map(|a| a.created_at).min(),
            newest_backup: artifacts.iter().map(|a| a.created_at).max(),
            restore_pending: self.pending_restore().await?.is_some(),
            scheduler_state: self.scheduler.state(),
            scheduler: self.scheduler.stats(),
        })
    }
}

/// The per-tick job: container, then retention, then audit
fn scheduled_backup_job(
    builder: ArchiveBuilder,
    retention: RetentionManager,
    audit: Arc<dyn AuditSink>,
) -> TickJob {
    Arc::new(move |config| -> BoxFuture<'static, anyhow::Result<()>> {
        let builder = builder.clone();
        let retention = retention.clone();
        let audit = audit.clone();
        Box::pin(async move {
            run_backup(
                &builder,
                &retention,
                audit.as_ref(),
                BackupOrigin::Scheduled,
                config,
            )
            .await
            .map(|_| ())
            .map_err(anyhow::Error::from)
        })
    })
}

async fn run_backup(
    builder: &ArchiveBuilder,
    retention: &RetentionManager,
    audit: &dyn AuditSink,
    origin: BackupOrigin,
    config: AutoBackupConfig,
) -> BackupResult<BackupArtifact> {
    let artifact = builder.build_next(origin, config.scope).await?;

    let action = match origin {
        BackupOrigin::Manual => audit::ACTION_MANUAL_BACKUP,
        BackupOrigin::Scheduled => audit::ACTION_SCHEDULED_BACKUP,
    };
    record(
        audit,
        action,
        json!({
            "artifact": artifact.name,
            "scope": config.scope,
            "size_bytes": artifact.size_bytes,
        }),
    )
    .await;

    if config.retention_cap > 0 {
        match retention.enforce(i64::from(config.retention_cap)).await {
            Ok(report) => {
                record(
                    audit,
                    audit::ACTION_RETENTION_SWEEP,
                    json!({
                        "retention_cap": config.retention_cap,
                        "deleted": report.deleted,
                        "failed": report.failed,
                    }),
                )
                .await;
            }
            Err(e) => warn!("Retention sweep failed: {}", e),
        }
    }

    Ok(artifact)
}

/// Append an audit entry; a failing sink never fails the operation
async fn record(sink: &dyn AuditSink, action: &str, details: serde_json::Value) {
    let entry = AuditRecord::new(action, audit::ENTITY_BACKUP, details);
    if let Err(e) = sink.append(entry).await {
        warn!("Failed to record audit entry {}: {}", action, e);
    }
}
