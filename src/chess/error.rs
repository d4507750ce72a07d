use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.0 {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.0 = Some(msg.to_string());
            }
        }
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

/// Failure to open or decode a PGN source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Invalid path pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
    #[error("No files match '{0}'")]
    NoMatch(String),
    #[error("Failed to open file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to initialize zstd decoder for '{}': {source}", path.display())]
    Decoder {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid compression value '{0}'. Supported values: 'zstd' or omitted.")]
    Compression(String),
}

/// One parser layer rejecting a game text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("no game found")]
    NoGame,
    #[error("read error: {0}")]
    Read(String),
    #[error("illegal move '{san}' at ply {ply}")]
    IllegalMove { san: String, ply: usize },
    #[error("unparsable move token '{0}'")]
    BadToken(String),
    #[error("no moves found in non-empty movetext")]
    NoMoves,
}

/// Every loader layer failed for one game.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reasons}")]
pub struct GameLoadError {
    pub reasons: String,
    pub raw_pgn: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkerError {
    #[error("Background worker unavailable: {0}")]
    Unavailable(String),
    #[error("Background worker disconnected")]
    Disconnected,
    #[error("Worker error: {0}")]
    Remote(String),
    #[error("Unexpected worker response for request {0}")]
    UnexpectedResponse(u64),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayError {
    #[error("start ply {start} is beyond the last ply {total}")]
    StartOutOfRange { start: usize, total: usize },
    #[error("timeouts must be finite and non-decreasing (ply {0})")]
    InvalidTimeout(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid replay config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {value}")]
    Value { field: &'static str, value: f64 },
}
