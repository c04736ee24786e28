//! Integration tests for the auto-backup scheduler
//!
//! Time is paused, so hour-long intervals run instantly and tick counts are
//! deterministic.

use backup::scheduler::{BackupScheduler, TickJob};
use backup::{AutoBackupConfig, BackupScope, SchedulerState};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn config(scope: BackupScope) -> AutoBackupConfig {
    AutoBackupConfig {
        enabled: true,
        interval_hours: 1,
        scope,
        retention_cap: 0,
    }
}

/// Job that counts its starts and then works for `work`
fn counting_job(started: Arc<AtomicUsize>, work: Duration) -> TickJob {
    Arc::new(move |_config| -> BoxFuture<'static, anyhow::Result<()>> {
        let started = started.clone();
        Box::pin(async move {
            started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(work).await;
            anyhow::Ok(())
        })
    })
}

#[tokio::test(start_paused = true)]
async fn test_restart_does_not_stack_timers() {
    let started = Arc::new(AtomicUsize::new(0));
    let scheduler = BackupScheduler::new(counting_job(started.clone(), Duration::ZERO));

    scheduler.start(config(BackupScope::Data)).unwrap();
    scheduler.start(config(BackupScope::Data)).unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Running);

    tokio::time::sleep(Duration::from_secs(3 * 3600 + 1)).await;

    assert_eq!(started.load(Ordering::SeqCst), 3);
    assert_eq!(scheduler.stats().fired, 3);
    assert_eq!(scheduler.stats().succeeded, 3);
}

#[tokio::test(start_paused = true)]
async fn test_no_tick_before_first_interval() {
    let started = Arc::new(AtomicUsize::new(0));
    let scheduler = BackupScheduler::new(counting_job(started.clone(), Duration::ZERO));

    scheduler.start(config(BackupScope::Data)).unwrap();
    tokio::time::sleep(Duration::from_secs(3599)).await;
    assert_eq!(started.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(started.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_tick_is_skipped() {
    let started = Arc::new(AtomicUsize::new(0));
    let scheduler =
        BackupScheduler::new(counting_job(started.clone(), Duration::from_secs(150)));

    // Ticks at 60..=360; each run takes 150s
    scheduler.start_with_period(config(BackupScope::Data), Duration::from_secs(60));
    tokio::time::sleep(Duration::from_secs(370)).await;

    let stats = scheduler.stats();
    assert_eq!(stats.fired, 6);
    assert_eq!(started.load(Ordering::SeqCst), 2, "runs at 60s and 240s");
    assert_eq!(stats.skipped, 4);
}

#[tokio::test(start_paused = true)]
async fn test_stop_lets_running_tick_finish() {
    let finished = Arc::new(AtomicBool::new(false));
    let started = Arc::new(AtomicUsize::new(0));

    let job: TickJob = {
        let finished = finished.clone();
        let started = started.clone();
        Arc::new(move |_config| -> BoxFuture<'static, anyhow::Result<()>> {
            let finished = finished.clone();
            let started = started.clone();
            Box::pin(async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(100)).await;
                finished.store(true, Ordering::SeqCst);
                anyhow::Ok(())
            })
        })
    };
    let scheduler = BackupScheduler::new(job);

    scheduler.start_with_period(config(BackupScope::Data), Duration::from_secs(60));
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(started.load(Ordering::SeqCst), 1);
    assert!(scheduler.is_busy());

    scheduler.stop();
    assert_eq!(scheduler.state(), SchedulerState::Stopped);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(finished.load(Ordering::SeqCst), "in-flight tick completes");
    assert_eq!(started.load(Ordering::SeqCst), 1, "no ticks after stop");
    assert!(!scheduler.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_restart_uses_new_config() {
    let scopes = Arc::new(Mutex::new(Vec::new()));
    let job: TickJob = {
        let scopes = scopes.clone();
        Arc::new(move |config| -> BoxFuture<'static, anyhow::Result<()>> {
            let scopes = scopes.clone();
            Box::pin(async move {
                scopes.lock().unwrap().push(config.scope);
                anyhow::Ok(())
            })
        })
    };
    let scheduler = BackupScheduler::new(job);

    scheduler.start_with_period(config(BackupScope::Data), Duration::from_secs(60));
    tokio::time::sleep(Duration::from_secs(30)).await;
    scheduler.start_with_period(config(BackupScope::Full), Duration::from_secs(60));
    tokio::time::sleep(Duration::from_secs(125)).await;

    assert_eq!(
        *scopes.lock().unwrap(),
        vec![BackupScope::Full, BackupScope::Full]
    );
    assert_eq!(
        scheduler.active_config().map(|c| c.scope),
        Some(BackupScope::Full)
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_tick_is_counted_and_scheduler_keeps_running() {
    let job: TickJob = Arc::new(|_config| -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async { Err::<(), _>(anyhow::anyhow!("disk full")) })
    });
    let scheduler = BackupScheduler::new(job);

    scheduler.start_with_period(config(BackupScope::Data), Duration::from_secs(60));
    tokio::time::sleep(Duration::from_secs(181)).await;

    let stats = scheduler.stats();
    assert_eq!(stats.fired, 3);
    assert_eq!(stats.failed, 3);
    assert_eq!(scheduler.state(), SchedulerState::Running);
}
