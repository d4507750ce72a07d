use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Ordered SAN tokens of one game's main line.
pub type MoveList = SmallVec<[String; 128]>;

/// One game sliced out of a loaded PGN blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// Ordinal position in the source blob, stable for that blob.
    pub index: usize,
    /// Tag pairs plus movetext, exactly as split.
    pub raw_pgn: String,
}

/// Header-derived display data for one game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMetadata {
    /// 1-based game number as shown in lists.
    pub number: usize,
    pub white: String,
    pub black: String,
    pub result: String,
    /// 0 when the tag is missing or not a number.
    pub white_elo: u32,
    pub black_elo: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eco: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl GameMetadata {
    pub fn rating_sum(&self) -> u64 {
        self.white_elo as u64 + self.black_elo as u64
    }
}

/// Remaining seconds for both sides at one point of the game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockState {
    pub white: f64,
    pub black: f64,
}
