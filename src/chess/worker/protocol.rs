use crate::chess::filter::FilterCriteria;
use crate::chess::loader::LoadedGame;
use crate::chess::metadata::UNKNOWN_PLAYER;
use crate::chess::types::{ClockState, GameMetadata};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Messages accepted by the worker. Every message carries the id its
/// response will echo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    /// Replaces the loaded games with those split out of `payload`.
    Load { payload: String, id: u64 },
    Filter { payload: FilterCriteria, id: u64 },
    /// Parses one loaded game for replay.
    LoadGame { payload: usize, id: u64 },
}

impl Request {
    pub fn id(&self) -> u64 {
        match self {
            Request::Load { id, .. } | Request::Filter { id, .. } | Request::LoadGame { id, .. } => {
                *id
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    Load { payload: LoadSummary, id: u64 },
    /// Matching game indices, highest combined rating first.
    Filter { payload: Vec<usize>, id: u64 },
    LoadGame { payload: GamePayload, id: u64 },
    /// A handler failed; `payload` is the message.
    Error { payload: String, id: u64 },
}

impl Response {
    pub fn id(&self) -> u64 {
        match self {
            Response::Load { id, .. }
            | Response::Filter { id, .. }
            | Response::LoadGame { id, .. }
            | Response::Error { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Response::Load { .. } => "load",
            Response::Filter { .. } => "filter",
            Response::LoadGame { .. } => "loadGame",
            Response::Error { .. } => "error",
        }
    }
}

/// What a `load` reports back: the metadata list plus the distinct values
/// a consumer needs to populate its pickers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadSummary {
    pub count: usize,
    pub metadata: Vec<GameMetadata>,
    /// Sorted, without the placeholder name.
    pub white_players: Vec<String>,
    pub black_players: Vec<String>,
    /// `(code, games)` by descending count, then code. Codes containing `?`
    /// are left out.
    pub eco_counts: Vec<(String, usize)>,
}

impl LoadSummary {
    pub fn from_metadata(metadata: Vec<GameMetadata>) -> Self {
        let mut white = BTreeSet::new();
        let mut black = BTreeSet::new();
        let mut eco: HashMap<&str, usize> = HashMap::new();

        for meta in &metadata {
            if is_named(&meta.white) {
                white.insert(meta.white.clone());
            }
            if is_named(&meta.black) {
                black.insert(meta.black.clone());
            }
            if let Some(code) = meta.eco.as_deref()
                && !code.is_empty()
                && !code.contains('?')
            {
                *eco.entry(code).or_default() += 1;
            }
        }

        let mut eco_counts: Vec<(String, usize)> = eco
            .into_iter()
            .map(|(code, count)| (code.to_string(), count))
            .collect();
        eco_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Self {
            count: metadata.len(),
            white_players: white.into_iter().collect(),
            black_players: black.into_iter().collect(),
            eco_counts,
            metadata,
        }
    }
}

fn is_named(player: &str) -> bool {
    !player.is_empty() && player != UNKNOWN_PLAYER
}

/// One game prepared for replay, or the raw text and reasons when no
/// parser accepted it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GamePayload {
    pub moves: Vec<String>,
    pub pgn: String,
    pub evaluations: Vec<Option<String>>,
    pub clock_history: Vec<ClockState>,
    pub think_times: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<LoadedGame> for GamePayload {
    fn from(game: LoadedGame) -> Self {
        Self {
            moves: game.moves.into_vec(),
            pgn: game.pgn,
            evaluations: game.evaluations,
            clock_history: game.clocks.history,
            think_times: game.clocks.think_times,
            error: None,
        }
    }
}

impl GamePayload {
    pub fn failed(raw_pgn: String, reasons: String) -> Self {
        Self {
            pgn: raw_pgn,
            error: Some(reasons),
            ..Self::default()
        }
    }
}
