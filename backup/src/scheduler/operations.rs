// File: backup/src/scheduler/operations.rs
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, instrument, warn};

use super::{AutoBackupConfig, SchedulerState};
use crate::errors::BackupResult;

/// One backup attempt, run once per tick with the config the timer was
/// started with
pub type TickJob =
    Arc<dyn Fn(AutoBackupConfig) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Debug, Default)]
struct TickCounters {
    fired: AtomicU64,
    skipped: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub fired: u64,
    pub skipped: u64,
    pub succeeded: u64,
    pub failed: u64,
}

struct ActiveTimer {
    handle: JoinHandle<()>,
    config: AutoBackupConfig,
}

pub struct BackupScheduler {
    job: TickJob,
    slot: Arc<tokio::sync::Mutex<()>>,
    timer: Mutex<Option<ActiveTimer>>,
    counters: Arc<TickCounters>,
}

impl BackupScheduler {
    pub fn new(job: TickJob) -> Self {
        Self {
            job,
            slot: Arc::new(tokio::sync::Mutex::new(())),
            timer: Mutex::new(None),
            counters: Arc::new(TickCounters::default()),
        }
    }

    /// Install the timer for `config`, replacing any existing one.
    ///
    /// A disabled config stops the scheduler instead.
    #[instrument(skip(self))]
    pub fn start(&self, config: AutoBackupConfig) -> BackupResult<()> {
        config.validate()?;

        if !config.enabled {
            info!("Auto backup disabled, scheduler not started");
            self.stop();
            return Ok(());
        }

        self.start_with_period(config, config.interval());
        Ok(())
    }

    /// Install a timer with an explicit period. `start` derives the period
    /// from `interval_hours`; hosts and tests with shorter cadences call this.
    pub fn start_with_period(&self, config: AutoBackupConfig, period: Duration) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = timer.take() {
            previous.handle.abort();
            info!("Replaced existing auto backup timer");
        }

        let job = self.job.clone();
        let slot = self.slot.clone();
        let counters = self.counters.clone();

        let handle = tokio::spawn(async move {
            // First tick one full period from now; nothing carries over
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                counters.fired.fetch_add(1, Ordering::SeqCst);

                let permit = match slot.clone().try_lock_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        counters.skipped.fetch_add(1, Ordering::SeqCst);
                        warn!("Previous backup still running, skipping this tick");
                        continue;
                    }
                };

                // The tick runs in its own task so aborting the timer never cuts it short
                let job = job.clone();
                let counters = counters.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    match job(config).await {
                        Ok(()) => {
                            counters.succeeded.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => {
                            counters.failed.fetch_add(1, Ordering::SeqCst);
                            error!("✗ Scheduled backup failed: {}", e);
                        }
                    }
                });
            }
        });

        *timer = Some(ActiveTimer { handle, config });
        info!(
            "✓ Auto backup scheduled every {}s ({} scope, retention {})",
            period.as_secs(),
            config.scope,
            config.retention_cap
        );
    }

    /// Cancel the timer. A tick already running is left to finish.
    pub fn stop(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(active) = timer.take() {
            active.handle.abort();
            info!("Auto backup scheduler stopped");
        }
    }

    pub fn state(&self) -> SchedulerState {
        let timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        match timer.as_ref() {
            Some(active) if !active.handle.is_finished() => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }

    /// Config of the running timer, if any
    pub fn active_config(&self) -> Option<AutoBackupConfig> {
        let timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        timer.as_ref().map(|active| active.config)
    }

    /// Claim the single backup slot, or `None` if a backup is in flight.
    ///
    /// Out-of-band runs take the slot so they never overlap a tick.
    pub fn try_acquire_slot(&self) -> Option<OwnedMutexGuard<()>> {
        self.slot.clone().try_lock_owned().ok()
    }

    /// True while a tick or an out-of-band run holds the slot
    pub fn is_busy(&self) -> bool {
        self.slot.try_lock().is_err()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            fired: self.counters.fired.load(Ordering::SeqCst),
            skipped: self.counters.skipped.load(Ordering::SeqCst),
            succeeded: self.counters.succeeded.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }
}

impl Drop for BackupScheduler {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(active) = timer.take() {
            active.handle.abort();
        }
    }
}
