//! Integration tests for the caller-facing backup service

mod common;

use backup::constants::audit;
use backup::{AutoBackupConfig, BackupOrigin, BackupScope, SchedulerState};
use common::fixtures::*;
use std::time::Duration;

#[tokio::test]
async fn test_auto_backup_config_defaults_come_from_config() {
    let workspace = TestWorkspace::with_config(|builder| {
        builder.with_auto_backup(false, 12, BackupScope::Full, 5)
    })
    .await;

    let config = workspace.service.get_auto_backup_config().await.unwrap();
    assert_eq!(
        config,
        AutoBackupConfig {
            enabled: false,
            interval_hours: 12,
            scope: BackupScope::Full,
            retention_cap: 5,
        }
    );
}

#[tokio::test]
async fn test_auto_backup_config_round_trip_controls_scheduler() {
    let workspace = TestWorkspace::new().await;
    let enabled = AutoBackupConfig {
        enabled: true,
        interval_hours: 6,
        scope: BackupScope::Full,
        retention_cap: 3,
    };

    workspace
        .service
        .set_auto_backup_config(enabled)
        .await
        .unwrap();
    assert_eq!(workspace.service.get_auto_backup_config().await.unwrap(), enabled);
    assert_eq!(workspace.service.scheduler_state(), SchedulerState::Running);

    let disabled = AutoBackupConfig {
        enabled: false,
        ..enabled
    };
    workspace
        .service
        .set_auto_backup_config(disabled)
        .await
        .unwrap();
    assert_eq!(workspace.service.scheduler_state(), SchedulerState::Stopped);

    let records = workspace.store.database.recent_audit_records(10).await.unwrap();
    let config_changes = records
        .iter()
        .filter(|r| r.action == audit::ACTION_AUTO_BACKUP_CONFIG)
        .count();
    assert_eq!(config_changes, 2);
}

#[tokio::test]
async fn test_invalid_auto_backup_config_is_not_persisted() {
    let workspace = TestWorkspace::new().await;
    let before = workspace.service.get_auto_backup_config().await.unwrap();

    let err = workspace
        .service
        .set_auto_backup_config(AutoBackupConfig {
            enabled: true,
            interval_hours: 0,
            scope: BackupScope::Data,
            retention_cap: 1,
        })
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(workspace.service.get_auto_backup_config().await.unwrap(), before);
    assert_eq!(workspace.service.scheduler_state(), SchedulerState::Stopped);
}

#[tokio::test]
async fn test_unreadable_setting_falls_back_to_default() {
    let workspace = TestWorkspace::new().await;
    backup::SettingsStore::set_setting(
        &*workspace.store.database,
        "backup_interval_hours",
        "soon",
    )
    .await
    .unwrap();

    let config = workspace.service.get_auto_backup_config().await.unwrap();
    assert_eq!(config.interval_hours, 24);
}

#[tokio::test]
async fn test_start_from_settings_uses_persisted_config() {
    let workspace = TestWorkspace::new().await;
    assert_eq!(
        workspace.service.start_auto_backup_from_settings().await.unwrap(),
        workspace.service.get_auto_backup_config().await.unwrap()
    );
    assert_eq!(workspace.service.scheduler_state(), SchedulerState::Stopped);

    let enabled = AutoBackupConfig {
        enabled: true,
        interval_hours: 1,
        scope: BackupScope::Data,
        retention_cap: 0,
    };
    enabled
        .save(&*workspace.store.database)
        .await
        .unwrap();

    workspace.service.start_auto_backup_from_settings().await.unwrap();
    assert_eq!(workspace.service.scheduler_state(), SchedulerState::Running);
    assert_eq!(workspace.service.scheduler().active_config(), Some(enabled));
}

#[tokio::test]
async fn test_trigger_backup_now_applies_retention() {
    let workspace = TestWorkspace::new().await;
    let layout = workspace.layout();
    for (name, age) in [("old_1.tar.gz", 300), ("old_2.tar.gz", 200), ("old_3.tar.gz", 100)] {
        write_aged_file(&layout.artifact_path(name), b"artifact", age);
    }
    workspace
        .service
        .set_auto_backup_config(AutoBackupConfig {
            enabled: false,
            interval_hours: 24,
            scope: BackupScope::Data,
            retention_cap: 2,
        })
        .await
        .unwrap();

    let artifact = workspace.service.trigger_backup_now().await.unwrap();
    assert_eq!(artifact.origin, BackupOrigin::Manual);
    assert_eq!(artifact.kind, BackupScope::Data);

    let names: Vec<String> = workspace
        .service
        .list_backups()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec![artifact.name.clone(), "old_3.tar.gz".to_string()]);

    let records = workspace.store.database.recent_audit_records(10).await.unwrap();
    assert!(records
        .iter()
        .any(|r| r.action == audit::ACTION_RETENTION_SWEEP));
}

#[tokio::test]
async fn test_trigger_backup_now_conflicts_with_running_backup() {
    let workspace = TestWorkspace::new().await;

    let permit = workspace.service.scheduler().try_acquire_slot().unwrap();
    let err = workspace.service.trigger_backup_now().await.unwrap_err();
    assert!(err.is_conflict());

    drop(permit);
    assert!(workspace.service.trigger_backup_now().await.is_ok());
}

#[tokio::test]
async fn test_delete_backup() {
    let workspace = TestWorkspace::new().await;
    let artifact = workspace
        .service
        .create_backup(BackupScope::Data)
        .await
        .unwrap();

    workspace.service.delete_backup(&artifact.name).await.unwrap();
    assert!(workspace.service.list_backups().await.unwrap().is_empty());

    let err = workspace
        .service
        .delete_backup(&artifact.name)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = workspace
        .service
        .delete_backup("../data/store.db")
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(workspace.layout().database_path().exists());

    let actions: Vec<String> = workspace
        .store
        .database
        .recent_audit_records(10)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.action)
        .collect();
    assert!(actions.contains(&audit::ACTION_MANUAL_BACKUP.to_string()));
    assert!(actions.contains(&audit::ACTION_DELETE_BACKUP.to_string()));
}

#[tokio::test]
async fn test_list_backups_newest_first_and_stats() {
    let workspace = TestWorkspace::new().await;
    let layout = workspace.layout();
    write_aged_file(&layout.artifact_path(names::MANUAL_FULL), b"full", 200);
    write_aged_file(&layout.artifact_path(names::SCHEDULED_DATA), b"data", 100);
    write_aged_file(&layout.artifact_path(names::SAFETY), b"raw", 300);

    let listed = workspace.service.list_backups().await.unwrap();
    let listed_names: Vec<&str> = listed.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(
        listed_names,
        vec![names::SCHEDULED_DATA, names::MANUAL_FULL, names::SAFETY]
    );
    assert_eq!(listed[0].origin, BackupOrigin::Scheduled);
    assert_eq!(listed[1].kind, BackupScope::Full);

    let stats = workspace.service.get_backup_stats().await.unwrap();
    assert_eq!(stats.total_backups, 3);
    assert_eq!(stats.total_size_bytes, 11);
    assert_eq!(stats.by_kind.get("full"), Some(&1));
    assert_eq!(stats.by_kind.get("data"), Some(&2));
    assert!(stats.oldest_backup < stats.newest_backup);
    assert!(!stats.restore_pending);

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["total_backups"], 3);
    assert_eq!(json["scheduler"]["fired"], 0);
    let decoded: backup::BackupStats = serde_json::from_value(json).unwrap();
    assert_eq!(decoded.scheduler, stats.scheduler);
}

#[tokio::test]
async fn test_scheduled_tick_produces_auto_container() {
    let workspace = TestWorkspace::new().await;
    let config = AutoBackupConfig {
        enabled: true,
        interval_hours: 1,
        scope: BackupScope::Data,
        retention_cap: 0,
    };

    workspace
        .service
        .scheduler()
        .start_with_period(config, Duration::from_millis(200));

    let found = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let backups = workspace.service.list_backups().await.unwrap();
            if let Some(artifact) = backups
                .into_iter()
                .find(|a| a.origin == BackupOrigin::Scheduled)
            {
                return artifact;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("scheduled backup should appear");

    workspace.service.stop_scheduler();
    assert!(found.name.starts_with("auto_data_"));

    // Give the in-flight tick time to append its audit entry
    tokio::time::sleep(Duration::from_millis(200)).await;
    let records = workspace.store.database.recent_audit_records(10).await.unwrap();
    assert!(records
        .iter()
        .any(|r| r.action == audit::ACTION_SCHEDULED_BACKUP));
}
