use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{Contest, Game};

/// Where contest results come from. `None` means "not available right now":
/// not yet drawn, upstream down, or a payload we can't use. Callers never see
/// the reason; the implementation logs it.
pub trait ContestSource: Send + Sync {
    /// `numero = None` asks for the latest published contest.
    fn fetch(&self, game: Game, numero: Option<u64>) -> impl Future<Output = Option<Contest>> + Send;
}

/// Upstream results API over HTTP: `GET {base}/{game}/{numero-or-empty}`.
/// One attempt per call, no retry.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, game: Game, numero: Option<u64>) -> String {
        match numero {
            Some(n) => format!("{}/{}/{}", self.base_url, game, n),
            None => format!("{}/{}/", self.base_url, game),
        }
    }
}

impl ContestSource for HttpFetcher {
    async fn fetch(&self, game: Game, numero: Option<u64>) -> Option<Contest> {
        let url = self.url(game, numero);
        let requested = numero.map(|n| n.to_string()).unwrap_or_else(|| "latest".to_string());

        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(game = %game, contest = %requested, "[FETCH] transport error for {game}/{requested}: {e}");
                return None;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            warn!(game = %game, contest = %requested, status = status.as_u16(), "[FETCH] {game}/{requested} unavailable: HTTP {status}");
            return None;
        }

        let contest: Contest = match resp.json().await {
            Ok(c) => c,
            Err(e) => {
                warn!(game = %game, contest = %requested, "[FETCH] unusable payload for {game}/{requested}: {e}");
                return None;
            }
        };

        if contest.numero == 0 {
            warn!(game = %game, contest = %requested, "[FETCH] {game}/{requested} not issued yet (numero=0)");
            return None;
        }

        debug!(game = %game, numero = contest.numero, "[FETCH] {game}/{requested} ok");
        Some(contest)
    }
}
