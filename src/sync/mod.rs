//! Bootstrap and incremental synchronization of the per-game windows.
//!
//! Both passes follow the same shape: ask the source for the latest contest of
//! each game, fan out bounded requests for the numbers in between, fold the
//! results into one in-memory document, and write that document once.

mod bootstrap;
mod incremental;

use std::collections::BTreeMap;
use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::fetcher::ContestSource;
use crate::state::window::batch_below;
use crate::state::WindowStore;
use crate::types::{Contest, Game};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What a pass did to one game's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GameOutcome {
    /// Window changed: `added` new contests, `evicted` old ones trimmed.
    Updated { latest: u64, added: usize, evicted: usize },
    /// Upstream has nothing newer than what is stored.
    Unchanged { latest: u64 },
    /// Latest contest unavailable upstream; window left as is.
    Skipped,
    /// Fetches did not finish before the game's deadline; window left as is.
    TimedOut,
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub outcomes: BTreeMap<Game, GameOutcome>,
}

impl SyncReport {
    pub fn record(&mut self, game: Game, outcome: GameOutcome) {
        self.outcomes.insert(game, outcome);
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, GameOutcome::Updated { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, GameOutcome::Unchanged { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, GameOutcome::Skipped))
    }

    pub fn timed_out(&self) -> usize {
        self.count(|o| matches!(o, GameOutcome::TimedOut))
    }

    pub fn contests_added(&self) -> usize {
        self.outcomes
            .values()
            .map(|o| match o {
                GameOutcome::Updated { added, .. } => *added,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&GameOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| pred(o)).count()
    }
}

// ---------------------------------------------------------------------------
// Synchronizer
// ---------------------------------------------------------------------------

/// Tuning shared by both passes.
#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    /// Max contests kept per game.
    pub window_size: usize,
    /// Max in-flight upstream requests per game.
    pub concurrency: usize,
    /// Budget for one game's numbered fetches within a pass.
    pub deadline: Duration,
}

impl From<&Config> for SyncSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            window_size: cfg.window_size,
            concurrency: cfg.fetch_concurrency,
            deadline: cfg.sync_deadline,
        }
    }
}

/// Sole writer of the store. Passes are `&self` but must not run concurrently;
/// the scheduler guarantees that.
pub struct Synchronizer<S> {
    source: Arc<S>,
    store: Arc<WindowStore>,
    settings: SyncSettings,
}

impl<S: ContestSource> Synchronizer<S> {
    pub fn new(source: Arc<S>, store: Arc<WindowStore>, settings: SyncSettings) -> Self {
        Self { source, store, settings }
    }

    /// Fetch every number in `numbers` with at most `concurrency` requests in
    /// flight, dropping unavailable ones.
    async fn fetch_many(&self, game: Game, numbers: RangeInclusive<u64>) -> Vec<Contest> {
        stream::iter(numbers)
            .map(|n| {
                let source = Arc::clone(&self.source);
                async move { source.fetch(game, Some(n)).await }
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .filter_map(|c| async move { c })
            .collect::<Vec<Contest>>()
            .await
    }

    /// Contests after `stored` and before `latest`, requested highest first in
    /// batches until `cap - 1` of them are in hand or `stored` is reached. Each
    /// absent contest pulls one more older number into the next batch.
    async fn fetch_newer(&self, game: Game, stored: u64, latest: u64, cap: usize) -> Vec<Contest> {
        let wanted = cap.saturating_sub(1);
        let mut fetched = Vec::new();
        let mut upper = latest;

        loop {
            let needed = wanted.saturating_sub(fetched.len()) as u64;
            let batch = batch_below(upper, stored, needed);
            if batch.is_empty() {
                break;
            }
            let lowest = *batch.start();
            let requested = upper - lowest;
            let got = self.fetch_many(game, batch).await;
            if (got.len() as u64) < requested {
                debug!(game = %game, below = lowest, "Gaps in {game} batch, widening to older contests");
            }
            fetched.extend(got);
            upper = lowest;
        }
        fetched
    }

    /// Run one game's fetch phase under its own deadline. `None` if it does not
    /// finish in time; other games get a fresh budget.
    async fn within_deadline<F: Future>(&self, fetches: F) -> Option<F::Output> {
        tokio::time::timeout(self.settings.deadline, fetches).await.ok()
    }
}
