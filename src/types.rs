use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// Lottery products mirrored by the service. The set is closed: anything else
/// is rejected at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    MegaSena,
    Lotofacil,
    Quina,
    Lotomania,
    Timemania,
    DuplaSena,
    Federal,
    DiaDeSorte,
    SuperSete,
    MaisMilionaria,
}

impl Game {
    pub const ALL: [Game; 10] = [
        Game::MegaSena,
        Game::Lotofacil,
        Game::Quina,
        Game::Lotomania,
        Game::Timemania,
        Game::DuplaSena,
        Game::Federal,
        Game::DiaDeSorte,
        Game::SuperSete,
        Game::MaisMilionaria,
    ];

    /// Path segment used by the upstream API and by our own routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Game::MegaSena => "megasena",
            Game::Lotofacil => "lotofacil",
            Game::Quina => "quina",
            Game::Lotomania => "lotomania",
            Game::Timemania => "timemania",
            Game::DuplaSena => "duplasena",
            Game::Federal => "federal",
            Game::DiaDeSorte => "diadesorte",
            Game::SuperSete => "supersete",
            Game::MaisMilionaria => "maismilionaria",
        }
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Game {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Game::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| AppError::UnsupportedGame(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Contest
// ---------------------------------------------------------------------------

/// One drawing of one game. Only `numero` is interpreted; every other upstream
/// field (draw date, winners, prizes, ...) is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contest {
    pub numero: u64,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
impl Contest {
    /// Bare record with no upstream payload.
    pub fn new(numero: u64) -> Self {
        Self {
            numero,
            fields: serde_json::Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store document
// ---------------------------------------------------------------------------

/// Durable shape: `{ "<game>": [contest, ...] }`, windows ascending by `numero`.
pub type StoreDocument = BTreeMap<Game, Vec<Contest>>;
