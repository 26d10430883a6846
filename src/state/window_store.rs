use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::types::{Contest, Game, StoreDocument};

// ---------------------------------------------------------------------------
// WindowStore
// ---------------------------------------------------------------------------

/// Durable JSON document holding every game's window.
///
/// The file is always read fully and written fully. Writes land in a sibling
/// temp file that is renamed over the target, and the lock keeps in-process
/// readers from observing the file mid-swap.
pub struct WindowStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl WindowStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the document has been created. This is the bootstrap guard, so
    /// a failed check is an error rather than "absent".
    pub async fn exists(&self) -> Result<bool> {
        let _guard = self.lock.read().await;
        tokio::fs::try_exists(&self.path).await.map_err(|e| {
            AppError::StoreUnavailable(format!("failed to check {}: {e}", self.path.display()))
        })
    }

    /// Read and parse the whole document. Missing or corrupt files surface as
    /// `StoreUnavailable`.
    pub async fn load(&self) -> Result<StoreDocument> {
        let raw = {
            let _guard = self.lock.read().await;
            match tokio::fs::read(&self.path).await {
                Ok(raw) => raw,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(AppError::StoreUnavailable(format!(
                        "{} does not exist",
                        self.path.display()
                    )));
                }
                Err(e) => {
                    return Err(AppError::StoreUnavailable(format!(
                        "failed to read {}: {e}",
                        self.path.display()
                    )));
                }
            }
        };

        serde_json::from_slice(&raw).map_err(|e| {
            AppError::StoreUnavailable(format!("failed to parse {}: {e}", self.path.display()))
        })
    }

    /// Replace the document on disk with `doc`, pretty-printed.
    pub async fn save(&self, doc: &StoreDocument) -> Result<()> {
        let payload = serde_json::to_vec_pretty(doc)?;
        let temp_path = self.temp_path();

        let _guard = self.lock.write().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&temp_path, &payload).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        let contests: usize = doc.values().map(Vec::len).sum();
        info!(
            path = %self.path.display(),
            games = doc.len(),
            contests,
            bytes = payload.len(),
            "Store written: {} games, {contests} contests",
            doc.len(),
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "store.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    // -----------------------------------------------------------------------
    // Read projections
    // -----------------------------------------------------------------------

    /// One game's contests, most recent first. A supported game with nothing
    /// stored yields an empty list.
    pub async fn read_game(&self, game: Game) -> Result<Vec<Contest>> {
        let mut doc = self.load().await?;
        let mut contests = doc.remove(&game).unwrap_or_default();
        contests.sort_by(|a, b| b.numero.cmp(&a.numero));
        debug!(game = %game, count = contests.len(), "Read game window");
        Ok(contests)
    }

    /// Every stored window exactly as persisted (ascending per game).
    pub async fn read_all(&self) -> Result<StoreDocument> {
        self.load().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(game: Game, numbers: &[u64]) -> StoreDocument {
        let mut doc = StoreDocument::new();
        doc.insert(game, numbers.iter().copied().map(Contest::new).collect());
        doc
    }

    #[tokio::test]
    async fn missing_document_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = WindowStore::new(dir.path().join("resultados.json"));

        assert!(!store.exists().await.unwrap());
        assert!(matches!(store.load().await, Err(AppError::StoreUnavailable(_))));
        assert!(matches!(store.read_game(Game::Quina).await, Err(AppError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn failed_existence_check_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let store = WindowStore::new(blocker.join("resultados.json"));

        assert!(matches!(store.exists().await, Err(AppError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn corrupt_document_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resultados.json");
        std::fs::write(&path, b"{\"quina\": [").unwrap();
        let store = WindowStore::new(&path);

        assert!(store.exists().await.unwrap());
        assert!(matches!(store.read_all().await, Err(AppError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn save_then_load_returns_same_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = WindowStore::new(dir.path().join("nested").join("resultados.json"));
        let doc = doc_with(Game::MegaSena, &[1, 2, 3]);

        store.save(&doc).await.unwrap();
        assert!(store.exists().await.unwrap());
        assert_eq!(store.load().await.unwrap(), doc);
        assert!(!dir.path().join("nested").join("resultados.json.tmp").exists());
    }

    #[tokio::test]
    async fn saved_document_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resultados.json");
        let store = WindowStore::new(&path);
        store.save(&doc_with(Game::Lotofacil, &[7])).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"lotofacil\": ["), "got {text}");
    }

    #[tokio::test]
    async fn read_game_is_descending_and_read_all_is_as_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = WindowStore::new(dir.path().join("resultados.json"));
        store.save(&doc_with(Game::Quina, &[4, 5, 6])).await.unwrap();

        let desc: Vec<u64> = store.read_game(Game::Quina).await.unwrap().iter().map(|c| c.numero).collect();
        assert_eq!(desc, vec![6, 5, 4]);

        let all = store.read_all().await.unwrap();
        let asc: Vec<u64> = all[&Game::Quina].iter().map(|c| c.numero).collect();
        assert_eq!(asc, vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn supported_game_without_window_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = WindowStore::new(dir.path().join("resultados.json"));
        store.save(&doc_with(Game::Quina, &[1])).await.unwrap();

        assert!(store.read_game(Game::Federal).await.unwrap().is_empty());
    }
}
