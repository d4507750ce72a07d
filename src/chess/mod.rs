pub mod broadcast;
pub mod clock;
pub mod config;
pub mod cursor;
pub mod error;
pub mod filter;
pub mod loader;
pub mod log;
pub mod metadata;
pub mod moves;
pub mod reader;
pub mod replay;
pub mod timecontrol;
pub mod types;
pub mod visitor;
pub mod worker;

pub use config::{ReplayConfig, ReplayMode};
pub use cursor::GameCursor;
pub use error::{ConfigError, GameLoadError, ParseError, ReplayError, SourceError, WorkerError};
pub use filter::{FilterCriteria, MoveCache, filter};
pub use loader::{Layer, LoadedGame, load_game};
pub use metadata::extract;
pub use moves::tokenize;
pub use reader::{CompressionMode, read_source, split};
pub use types::{ClockState, GameMetadata, GameRecord, MoveList};
pub use worker::WorkerClient;
