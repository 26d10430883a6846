//! Shared synchronization status for the /health endpoint.
//! Updated by the scheduler and bootstrap, read by the API.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;

use crate::sync::{GameOutcome, SyncReport};
use crate::types::Game;

/// Shared pass metrics. Written by the scheduler, read by the API.
#[derive(Default)]
pub struct SyncStatus {
    /// True while a synchronization pass is in progress.
    running: AtomicBool,
    /// Passes finished since process start, successful or not.
    passes: AtomicU64,
    last_pass: Mutex<Option<LastPass>>,
}

/// Held for the duration of a pass; clears the running flag on drop, even if
/// the pass panics.
pub struct PassGuard {
    status: Arc<SyncStatus>,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.status.running.store(false, Ordering::Release);
    }
}

impl SyncStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark a pass as started. `None` if another pass is still running.
    pub fn try_begin(self: &Arc<Self>) -> Option<PassGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard { status: Arc::clone(self) })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn record_success(&self, report: &SyncReport) {
        self.finish(true, report.outcomes.clone());
    }

    /// The pass aborted before touching any game (store unreadable).
    pub fn record_failure(&self) {
        self.finish(false, BTreeMap::new());
    }

    fn finish(&self, ok: bool, games: BTreeMap<Game, GameOutcome>) {
        let finished_at = Utc::now().to_rfc3339();

        if let Ok(mut last) = self.last_pass.lock() {
            *last = Some(LastPass { finished_at, ok, games });
        }
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, store_present: bool) -> HealthResponse {
        HealthResponse {
            store_present,
            sync_running: self.is_running(),
            passes: self.passes(),
            last_pass: self.last_pass.lock().ok().and_then(|l| l.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub store_present: bool,
    pub sync_running: bool,
    pub passes: u64,
    pub last_pass: Option<LastPass>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastPass {
    pub finished_at: String,
    pub ok: bool,
    pub games: BTreeMap<Game, GameOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_pass_may_run_at_a_time() {
        let status = SyncStatus::new();
        let guard = status.try_begin().expect("first pass starts");
        assert!(status.is_running());
        assert!(status.try_begin().is_none());

        drop(guard);
        assert!(!status.is_running());
        assert!(status.try_begin().is_some());
    }

    #[test]
    fn snapshot_reflects_last_report() {
        let status = SyncStatus::new();
        assert!(status.snapshot(false).last_pass.is_none());

        let mut report = SyncReport::default();
        report.record(Game::Quina, GameOutcome::Updated { latest: 9, added: 2, evicted: 0 });
        report.record(Game::Federal, GameOutcome::Skipped);
        status.record_success(&report);

        let snap = status.snapshot(true);
        assert!(snap.store_present);
        assert_eq!(snap.passes, 1);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["last_pass"]["ok"], true);
        assert_eq!(json["last_pass"]["games"]["quina"]["status"], "updated");
        assert_eq!(json["last_pass"]["games"]["quina"]["added"], 2);
        assert_eq!(json["last_pass"]["games"]["federal"]["status"], "skipped");

        status.record_failure();
        let last = status.snapshot(true).last_pass.unwrap();
        assert!(!last.ok);
        assert!(last.games.is_empty());
        assert_eq!(status.passes(), 2);
    }
}
