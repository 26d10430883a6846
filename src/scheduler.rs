use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{error, info, warn};

use crate::api::health::SyncStatus;
use crate::config::ScheduleConfig;
use crate::fetcher::ContestSource;
use crate::sync::Synchronizer;

/// Longest single sleep while waiting for a fire. The wait left is recomputed
/// from the wall clock after each one.
const MAX_SLEEP: Duration = Duration::from_secs(60);

/// Fires the incremental synchronizer once a day at `schedule.at` in the
/// configured offset. A fire missed while the process was down is not caught
/// up, and a fire that lands while the previous pass is still running is
/// skipped.
pub struct Scheduler<S> {
    schedule: ScheduleConfig,
    sync: Arc<Synchronizer<S>>,
    status: Arc<SyncStatus>,
}

impl<S: ContestSource + 'static> Scheduler<S> {
    pub fn new(schedule: ScheduleConfig, sync: Arc<Synchronizer<S>>, status: Arc<SyncStatus>) -> Self {
        Self { schedule, sync, status }
    }

    pub async fn run(self) {
        loop {
            let (wait, next) = until_next_fire(Utc::now(), &self.schedule);
            info!(
                next_fire = %next,
                offset = %self.schedule.offset,
                wait_secs = wait.as_secs(),
                "Next sync at {next} ({})",
                self.schedule.offset,
            );
            loop {
                let left = remaining_until(Utc::now(), next, &self.schedule);
                if left.is_zero() {
                    break;
                }
                tokio::time::sleep(left.min(MAX_SLEEP)).await;
            }
            self.fire();
        }
    }

    /// Start a pass in the background. Returns false, without starting
    /// anything, if the previous pass hasn't finished.
    pub fn fire(&self) -> bool {
        let Some(guard) = self.status.try_begin() else {
            warn!("Previous sync still running, skipping this fire");
            return false;
        };

        let sync = Arc::clone(&self.sync);
        let status = Arc::clone(&self.status);
        tokio::spawn(async move {
            let _guard = guard;
            match sync.sync().await {
                Ok(report) => status.record_success(&report),
                Err(e) => {
                    error!("Sync pass failed: {e}");
                    status.record_failure();
                }
            }
        });
        true
    }
}

/// Time to sleep from `now` until the next `schedule.at`, and that fire time
/// as local wall-clock. A fire time equal to `now` counts as already passed.
pub fn until_next_fire(now: DateTime<Utc>, schedule: &ScheduleConfig) -> (Duration, NaiveDateTime) {
    let local_now = local_time(now, schedule);
    let mut next = local_now.date().and_time(schedule.at);
    if next <= local_now {
        next += chrono::Duration::days(1);
    }
    (remaining_until(now, next, schedule), next)
}

/// Wall-clock time from `now` until the local `target`; zero once reached.
pub fn remaining_until(now: DateTime<Utc>, target: NaiveDateTime, schedule: &ScheduleConfig) -> Duration {
    (target - local_time(now, schedule)).to_std().unwrap_or_default()
}

fn local_time(now: DateTime<Utc>, schedule: &ScheduleConfig) -> NaiveDateTime {
    now.naive_utc() + chrono::Duration::seconds(i64::from(schedule.offset.local_minus_utc()))
}
