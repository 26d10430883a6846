use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

use crate::api::health::{HealthResponse, SyncStatus};
use crate::error::AppError;
use crate::state::WindowStore;
use crate::types::{Contest, Game, StoreDocument};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<WindowStore>,
    pub status: Arc<SyncStatus>,
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/resultados", get(get_all_results))
        .route("/api/resultados/:game", get(get_game_results))
        .route("/health", get(get_health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Most recent first. Unsupported names are rejected before the store is read.
async fn get_game_results(
    State(state): State<ApiState>,
    Path(game): Path<String>,
) -> Result<Json<Vec<Contest>>, AppError> {
    let game: Game = game.parse()?;
    let contests = state.store.read_game(game).await?;
    debug!(game = %game, count = contests.len(), "GET /api/resultados/{game}");
    Ok(Json(contests))
}

/// Every game, each list in stored (ascending) order.
async fn get_all_results(State(state): State<ApiState>) -> Result<Json<StoreDocument>, AppError> {
    Ok(Json(state.store.read_all().await?))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let store_present = state.store.exists().await.unwrap_or_else(|e| {
        warn!("Health: {e}");
        false
    });
    Json(state.status.snapshot(store_present))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    /// Serve the router on an ephemeral port; returns its base URL.
    async fn spawn_api(store: Arc<WindowStore>) -> String {
        let app = router(ApiState { store, status: SyncStatus::new() });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn seeded_store(dir: &tempfile::TempDir) -> Arc<WindowStore> {
        let store = Arc::new(WindowStore::new(dir.path().join("resultados.json")));
        let mut doc = StoreDocument::new();
        doc.insert(Game::MegaSena, (1..=3).map(Contest::new).collect());
        doc.insert(Game::Quina, (10..=11).map(Contest::new).collect());
        store.save(&doc).await.unwrap();
        store
    }

    fn numbers(contests: &serde_json::Value) -> Vec<u64> {
        contests
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["numero"].as_u64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn game_results_are_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_api(seeded_store(&dir).await).await;

        let resp = reqwest::get(format!("{base}/api/resultados/megasena")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(numbers(&body), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn supported_game_without_data_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_api(seeded_store(&dir).await).await;

        let resp = reqwest::get(format!("{base}/api/resultados/federal")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_game_is_not_found_even_without_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(WindowStore::new(dir.path().join("resultados.json")));
        let base = spawn_api(store.clone()).await;

        let resp = reqwest::get(format!("{base}/api/resultados/powerball")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(!store.exists().await.unwrap());
    }

    #[tokio::test]
    async fn all_results_keep_stored_order() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_api(seeded_store(&dir).await).await;

        let resp = reqwest::get(format!("{base}/api/resultados")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(numbers(&body["megasena"]), vec![1, 2, 3]);
        assert_eq!(numbers(&body["quina"]), vec![10, 11]);
    }

    #[tokio::test]
    async fn unreadable_store_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resultados.json");
        std::fs::write(&path, b"{ truncated").unwrap();
        let base = spawn_api(Arc::new(WindowStore::new(&path))).await;

        let resp = reqwest::get(format!("{base}/api/resultados")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = reqwest::get(format!("{base}/api/resultados/quina")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn any_origin_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_api(seeded_store(&dir).await).await;

        let resp = reqwest::Client::new()
            .get(format!("{base}/api/resultados/quina"))
            .header("Origin", "https://somewhere.example")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn health_reports_store_presence() {
        let dir = tempfile::tempdir().unwrap();
        let base = spawn_api(seeded_store(&dir).await).await;

        let body: serde_json::Value = reqwest::get(format!("{base}/health")).await.unwrap().json().await.unwrap();
        assert_eq!(body["store_present"], true);
        assert_eq!(body["sync_running"], false);
        assert!(body["last_pass"].is_null());
    }
}
