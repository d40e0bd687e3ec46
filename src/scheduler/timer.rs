use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use super::RecurrenceScheduler;
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    /// Delay before the first sweep, so overdue rules are caught soon after startup.
    pub startup_delay: Duration,
    pub interval: Duration,
}

impl From<&Config> for TimerSettings {
    fn from(config: &Config) -> Self {
        Self {
            startup_delay: config.startup_delay(),
            interval: config.sweep_interval(),
        }
    }
}

/// Background task that sweeps the scheduler periodically until stopped.
/// Dropping the timer also ends the loop.
#[derive(Debug)]
pub struct SweepTimer {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweepTimer {
    /// Spawns the sweep loop on the current tokio runtime.
    pub fn start(scheduler: Arc<RecurrenceScheduler>, settings: TimerSettings) -> Self {
        let (shutdown, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(settings.startup_delay) => {}
                _ = stopped.changed() => return,
            }
            run_sweep(&scheduler);

            let mut ticker = time::interval_at(Instant::now() + settings.interval, settings.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => run_sweep(&scheduler),
                    _ = stopped.changed() => break,
                }
            }
            tracing::debug!("recurrence sweep timer stopped");
        });
        tracing::info!(
            startup_delay_secs = settings.startup_delay.as_secs(),
            interval_secs = settings.interval.as_secs(),
            "recurrence sweep timer started"
        );
        Self { shutdown, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signals the loop to exit and waits for it. A sweep already in progress
    /// completes first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            tracing::warn!(error = %err, "recurrence sweep timer ended abnormally");
        }
    }
}

fn run_sweep(scheduler: &RecurrenceScheduler) {
    let applied = scheduler.sweep_now();
    tracing::debug!(applied = applied.len(), "scheduled recurrence sweep finished");
}
