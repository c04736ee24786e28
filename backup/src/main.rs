// File: backup/src/main.rs
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use backup::constants::defaults;
use backup::{apply_pending_restore, BackupService, ConfigManager, Database, RecoveryOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("backup=info".parse()?)
        .add_directive("backupd=info".parse()?)
        .add_directive("sqlx=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting backup daemon");

    let config_dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("BACKUP_CONFIG_DIR").ok())
        .unwrap_or_else(|| defaults::CONFIG_DIR.to_string());

    let config_manager = ConfigManager::new(&config_dir).await?;
    let config = config_manager.get_current_config();
    let layout = config.layout();

    tokio::fs::create_dir_all(layout.data_dir()).await?;
    tokio::fs::create_dir_all(layout.backup_dir()).await?;

    // Must run before the store is opened
    let recovery_layout = layout.clone();
    let outcome =
        tokio::task::spawn_blocking(move || apply_pending_restore(&recovery_layout)).await?;
    match &outcome {
        RecoveryOutcome::NoPendingRestore => info!("No pending restore"),
        RecoveryOutcome::Applied { artifact_name, .. } => {
            info!("Store restored from {}", artifact_name)
        }
        RecoveryOutcome::StagedPayloadMissing { .. } | RecoveryOutcome::Failed { .. } => {
            warn!("Pending restore was not applied, booting with the current store")
        }
    }

    let database = Arc::new(Database::new(layout.database_path()).await?);
    info!("Database initialized");

    let service = Arc::new(BackupService::new(&config, database.clone()));

    match service.start_auto_backup_from_settings().await {
        Ok(auto) if auto.enabled => info!(
            "Auto backup active: every {}h, {} scope, keeping {}",
            auto.interval_hours, auto.scope, auto.retention_cap
        ),
        Ok(_) => info!("Auto backup disabled"),
        Err(e) => error!("Failed to start auto backup scheduler: {}", e),
    }

    match service.get_backup_stats().await {
        Ok(stats) => info!(
            "{} backups on disk ({:.1} MB)",
            stats.total_backups,
            stats.total_size_bytes as f64 / 1024.0 / 1024.0
        ),
        Err(e) => warn!("Could not read backup directory: {}", e),
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    service.stop_scheduler();
    database.close().await;

    Ok(())
}
