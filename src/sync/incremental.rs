use tracing::{debug, error, info, warn};

use super::{GameOutcome, SyncReport, Synchronizer};
use crate::error::Result;
use crate::fetcher::ContestSource;
use crate::state::window::{latest_numero, merge_window};
use crate::types::Game;

impl<S: ContestSource> Synchronizer<S> {
    /// One scheduled pass: bring every game's window up to the latest
    /// upstream contest, trim to the window size, and write the document once.
    ///
    /// If the stored document can't be read the pass aborts before any fetch
    /// and the file is left untouched. Per-game problems only skip that game.
    pub async fn sync(&self) -> Result<SyncReport> {
        let mut doc = self.store.load().await.map_err(|e| {
            error!("Sync aborted, store unreadable: {e}");
            e
        })?;

        let cap = self.settings.window_size;
        let mut report = SyncReport::default();

        for game in Game::ALL {
            let Some(latest) = self.source.fetch(game, None).await else {
                warn!(game = %game, "Sync: latest {game} contest unavailable, skipping this pass");
                report.record(game, GameOutcome::Skipped);
                continue;
            };

            let stored = doc.get(&game).map(|w| latest_numero(w)).unwrap_or(0);
            let api_latest = latest.numero;

            if api_latest <= stored {
                debug!(game = %game, stored, latest = api_latest, "Sync: {game} up to date at #{stored}");
                report.record(game, GameOutcome::Unchanged { latest: stored });
                continue;
            }

            let Some(mut fresh) = self
                .within_deadline(self.fetch_newer(game, stored, api_latest, cap))
                .await
            else {
                warn!(game = %game, stored, latest = api_latest, "Sync: {game} fetches missed the deadline, keeping stored window");
                report.record(game, GameOutcome::TimedOut);
                continue;
            };
            fresh.push(latest);

            let existing = doc.remove(&game).unwrap_or_default();
            let (window, stats) = merge_window(existing, fresh, cap);
            info!(
                game = %game,
                previous = stored,
                latest = api_latest,
                added = stats.added,
                evicted = stats.evicted,
                size = window.len(),
                "Sync: {game} #{stored} → #{api_latest}: +{} added, -{} evicted",
                stats.added,
                stats.evicted,
            );
            report.record(
                game,
                GameOutcome::Updated { latest: api_latest, added: stats.added, evicted: stats.evicted },
            );
            doc.insert(game, window);
        }

        self.store.save(&doc).await?;

        info!(
            updated = report.updated(),
            unchanged = report.unchanged(),
            skipped = report.skipped(),
            timed_out = report.timed_out(),
            added = report.contests_added(),
            "Sync complete: {} updated, {} unchanged, {} skipped, {} timed out",
            report.updated(),
            report.unchanged(),
            report.skipped(),
            report.timed_out(),
        );
        Ok(report)
    }
}
