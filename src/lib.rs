//! Load multi-game PGN archives, filter them, and replay games move by move
//! on a timer derived from their recorded clocks.

pub mod chess;

pub use chess::{
    FilterCriteria, GameCursor, GameMetadata, GameRecord, LoadedGame, ReplayConfig, ReplayMode,
    WorkerClient,
};
