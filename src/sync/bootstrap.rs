use tracing::{info, warn};

use super::{GameOutcome, SyncReport, Synchronizer};
use crate::error::Result;
use crate::fetcher::ContestSource;
use crate::state::window::{batch_below, build_window};
use crate::types::{Game, StoreDocument};

impl<S: ContestSource> Synchronizer<S> {
    /// Populate the store the first time the service runs. Does nothing and
    /// returns `None` once the document exists. If existence can't be
    /// determined the error is returned and nothing is written.
    pub async fn bootstrap_if_needed(&self) -> Result<Option<SyncReport>> {
        if self.store.exists().await? {
            info!(path = %self.store.path().display(), "Store present, skipping bootstrap");
            return Ok(None);
        }
        self.bootstrap().await.map(Some)
    }

    /// Build each game's window from the latest contest backwards and write
    /// the whole document once. A game whose latest contest is unavailable is
    /// left out; it never aborts the others.
    pub async fn bootstrap(&self) -> Result<SyncReport> {
        let cap = self.settings.window_size;
        let mut doc = StoreDocument::new();
        let mut report = SyncReport::default();

        info!(games = Game::ALL.len(), window_size = cap, "Bootstrap starting");

        for game in Game::ALL {
            let Some(latest) = self.source.fetch(game, None).await else {
                warn!(game = %game, "Bootstrap: latest {game} contest unavailable, skipping");
                report.record(game, GameOutcome::Skipped);
                continue;
            };
            let latest_numero = latest.numero;

            let backfill = batch_below(latest_numero, 0, cap.saturating_sub(1) as u64);
            let Some(mut contests) = self.within_deadline(self.fetch_many(game, backfill)).await else {
                warn!(game = %game, latest = latest_numero, "Bootstrap: {game} fetches missed the deadline, skipping");
                report.record(game, GameOutcome::TimedOut);
                continue;
            };
            contests.push(latest);

            let window = build_window(contests, cap);
            info!(
                game = %game,
                latest = latest_numero,
                contests = window.len(),
                "Bootstrap: {game} window holds {} contests up to #{latest_numero}",
                window.len(),
            );
            report.record(
                game,
                GameOutcome::Updated { latest: latest_numero, added: window.len(), evicted: 0 },
            );
            doc.insert(game, window);
        }

        self.store.save(&doc).await?;

        info!(
            updated = report.updated(),
            skipped = report.skipped(),
            timed_out = report.timed_out(),
            contests = report.contests_added(),
            "Bootstrap complete: {} games populated, {} skipped, {} timed out",
            report.updated(),
            report.skipped(),
            report.timed_out(),
        );
        Ok(report)
    }
}
