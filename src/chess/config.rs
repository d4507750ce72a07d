use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_FIXED_SECONDS: f64 = 1.0;
const DEFAULT_PROPORTIONAL_MINUTES: f64 = 1.0;
const DEFAULT_MIN_SECONDS_BETWEEN_MOVES: f64 = 1.0;
/// Fallback for an unusable minimum-gap input.
const FALLBACK_MIN_SECONDS_BETWEEN_MOVES: f64 = 0.1;

/// How per-ply delays are derived from a game's clock data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayMode {
    /// Every ply `fixedSeconds` apart.
    #[default]
    Fixed,
    /// Think times as recorded.
    Realtime,
    /// Think times rescaled to `proportionalMinutes` overall.
    Proportional,
}

impl std::str::FromStr for ReplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "realtime" | "real-time" => Ok(Self::Realtime),
            "proportional" => Ok(Self::Proportional),
            other => Err(format!(
                "unknown replay mode '{}' (expected fixed, realtime or proportional)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplayConfig {
    pub mode: ReplayMode,
    pub fixed_seconds: f64,
    pub proportional_minutes: f64,
    pub min_seconds_between_moves: f64,
    /// Pause after the last ply before the replay reports completion.
    pub completion_grace_ms: u64,
    pub inter_game_pause_ms: u64,
    /// Wait after loading a game before its replay starts.
    pub game_load_settle_ms: u64,
    pub stop_on_error: bool,
    /// Evaluation swing, in pawns, that stops a replay.
    pub stop_on_error_threshold: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            mode: ReplayMode::Fixed,
            fixed_seconds: DEFAULT_FIXED_SECONDS,
            proportional_minutes: DEFAULT_PROPORTIONAL_MINUTES,
            min_seconds_between_moves: DEFAULT_MIN_SECONDS_BETWEEN_MOVES,
            completion_grace_ms: 500,
            inter_game_pause_ms: 2000,
            game_load_settle_ms: 100,
            stop_on_error: false,
            stop_on_error_threshold: 1.0,
        }
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Value { field, value })
    }
}

impl ReplayConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("fixedSeconds", self.fixed_seconds)?;
        check_positive("proportionalMinutes", self.proportional_minutes)?;
        check_positive("minSecondsBetweenMoves", self.min_seconds_between_moves)?;
        check_positive("stopOnErrorThreshold", self.stop_on_error_threshold)?;
        Ok(())
    }

    /// Unusable values (zero, negative, NaN) fall back to one second.
    pub fn with_fixed_seconds(mut self, seconds: f64) -> Self {
        self.fixed_seconds = positive_or(seconds, DEFAULT_FIXED_SECONDS);
        self
    }

    /// Unusable values fall back to one minute.
    pub fn with_proportional_minutes(mut self, minutes: f64) -> Self {
        self.proportional_minutes = positive_or(minutes, DEFAULT_PROPORTIONAL_MINUTES);
        self
    }

    /// Unusable values fall back to a tenth of a second.
    pub fn with_min_seconds_between_moves(mut self, seconds: f64) -> Self {
        self.min_seconds_between_moves = positive_or(seconds, FALLBACK_MIN_SECONDS_BETWEEN_MOVES);
        self
    }

    pub fn with_mode(mut self, mode: ReplayMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn completion_grace(&self) -> Duration {
        Duration::from_millis(self.completion_grace_ms)
    }

    pub fn inter_game_pause(&self) -> Duration {
        Duration::from_millis(self.inter_game_pause_ms)
    }

    pub fn game_load_settle(&self) -> Duration {
        Duration::from_millis(self.game_load_settle_ms)
    }
}
