mod api;
mod config;
mod error;
mod fetcher;
mod scheduler;
mod state;
mod sync;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::health::SyncStatus;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::HttpFetcher;
use crate::scheduler::Scheduler;
use crate::state::WindowStore;
use crate::sync::{SyncSettings, Synchronizer};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    info!(
        upstream = %cfg.upstream_api_url,
        store = %cfg.store_path.display(),
        window_size = cfg.window_size,
        concurrency = cfg.fetch_concurrency,
        "Starting results mirror",
    );

    // --- Shared components ---
    let store = Arc::new(WindowStore::new(cfg.store_path.clone()));
    let fetcher = Arc::new(HttpFetcher::new(&cfg.upstream_api_url, cfg.fetch_timeout)?);
    let sync = Arc::new(Synchronizer::new(fetcher, Arc::clone(&store), SyncSettings::from(&cfg)));
    let status = SyncStatus::new();

    // --- Bootstrap: only when no store document exists yet ---
    if let Some(report) = sync.bootstrap_if_needed().await? {
        status.record_success(&report);
    }

    // --- Daily incremental sync ---
    let scheduler = Scheduler::new(cfg.schedule, Arc::clone(&sync), Arc::clone(&status));
    tokio::spawn(async move { scheduler.run().await });

    // --- HTTP API server ---
    let app = router(ApiState { store, status });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
