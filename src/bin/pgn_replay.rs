//! Command-line front end: load a PGN source, list and filter its games,
//! then replay the selection on the terminal.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pgn_replay::chess::broadcast::{available_months, broadcast_archive_url, default_month};
use pgn_replay::chess::clock::format_clock;
use pgn_replay::chess::cursor::GameCursor;
use pgn_replay::chess::error::{ConfigError, SourceError, WorkerError};
use pgn_replay::chess::log;
use pgn_replay::chess::reader::{CompressionMode, read_source};
use pgn_replay::chess::replay::{
    GameFeed, PreparedGame, ReplayTarget, SequenceControl, run_sequence,
};
use pgn_replay::chess::timecontrol::categorize_timecontrol;
use pgn_replay::chess::worker::WorkerClient;
use pgn_replay::{FilterCriteria, ReplayConfig, ReplayMode};

#[derive(Parser)]
#[command(name = "pgn-replay", about = "Replay games from a PGN archive")]
struct Cli {
    /// File or glob pattern of PGN sources.
    #[arg(required_unless_present = "archives")]
    pattern: Option<String>,

    /// Print Lichess broadcast archive URLs and exit: the latest month, or
    /// every published month of YEAR.
    #[arg(long, value_name = "YEAR", num_args = 0..=1)]
    archives: Option<Option<i32>>,

    /// Decode every source as zstd regardless of extension.
    #[arg(long)]
    zstd: bool,

    #[arg(long, default_value = "")]
    white: String,
    #[arg(long, default_value = "")]
    black: String,
    /// Comma-separated: 1-0, 0-1, draw.
    #[arg(long, default_value = "")]
    result: String,
    #[arg(long, default_value = "")]
    eco: String,
    #[arg(long, default_value = "")]
    event: String,
    #[arg(long, default_value = "")]
    time_control: String,
    /// Opening line the game must start with, e.g. "e4 e5 Nf3".
    #[arg(long)]
    opening: Option<String>,
    /// Apply rating bounds to either player.
    #[arg(long)]
    ignore_color: bool,
    #[arg(long, default_value_t = 0)]
    min_white_rating: u32,
    #[arg(long, default_value_t = 0)]
    min_black_rating: u32,
    #[arg(long, default_value_t = 0)]
    max_white_rating: u32,
    #[arg(long, default_value_t = 0)]
    max_black_rating: u32,

    /// Replay game number N (as listed).
    #[arg(long, conflicts_with = "all")]
    game: Option<usize>,
    /// Replay every matching game in turn.
    #[arg(long)]
    all: bool,
    /// Print the game list and exit.
    #[arg(long)]
    list: bool,

    /// JSON replay configuration; overrides the timing flags below.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "fixed")]
    mode: ReplayMode,
    #[arg(long, default_value_t = 1.0)]
    fixed_seconds: f64,
    /// Target length of a proportional replay.
    #[arg(long, default_value_t = 1.0)]
    minutes: f64,
    /// Shortest gap between moves in a proportional replay.
    #[arg(long, default_value_t = 1.0)]
    min_gap: f64,
    /// Stop when the evaluation swings by more than this many pawns.
    #[arg(long)]
    stop_on_error: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read config '{}': {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("game {0} is not among the matching games")]
    NoSuchGame(usize),
    #[error("no PGN source given")]
    NoSource,
}

impl Cli {
    fn criteria(&self) -> FilterCriteria {
        let target_moves: Vec<String> = self
            .opening
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        FilterCriteria {
            white: self.white.clone(),
            black: self.black.clone(),
            result: self.result.clone(),
            moves: !target_moves.is_empty(),
            target_moves,
            ignore_color: self.ignore_color,
            min_white_rating: self.min_white_rating,
            min_black_rating: self.min_black_rating,
            max_white_rating: self.max_white_rating,
            max_black_rating: self.max_black_rating,
            eco: self.eco.clone(),
            time_control: self.time_control.clone(),
            event: self.event.clone(),
        }
    }

    fn replay_config(&self) -> Result<ReplayConfig, CliError> {
        if let Some(path) = &self.config {
            let json = std::fs::read_to_string(path).map_err(|source| CliError::ConfigFile {
                path: path.clone(),
                source,
            })?;
            return Ok(ReplayConfig::from_json_str(&json)?);
        }

        let mut config = ReplayConfig::default()
            .with_mode(self.mode)
            .with_fixed_seconds(self.fixed_seconds)
            .with_proportional_minutes(self.minutes)
            .with_min_seconds_between_moves(self.min_gap);
        if let Some(threshold) = self.stop_on_error {
            config.stop_on_error = true;
            config.stop_on_error_threshold = threshold;
            config.validate()?;
        }
        Ok(config)
    }
}

/// Prints every applied move. An illegal move or an evaluation swing ends
/// the replay, and with it the sequence.
struct TerminalBoard {
    number: usize,
    cursor: GameCursor,
    stop_threshold: Option<f64>,
}

impl ReplayTarget for TerminalBoard {
    fn advance(&mut self, ply: usize) -> ControlFlow<()> {
        if let Err(err) = self.cursor.jump_to(ply + 1) {
            eprintln!("game {}: {}", self.number, err);
            return ControlFlow::Break(());
        }

        let san = self.cursor.moves()[ply].clone();
        let prefix = if ply.is_multiple_of(2) {
            format!("{}.", ply / 2 + 1)
        } else {
            format!("{}...", ply / 2 + 1)
        };
        let clocks = self
            .cursor
            .clocks()
            .map(|c| format!("  [{} | {}]", format_clock(c.white), format_clock(c.black)))
            .unwrap_or_default();
        println!("{} {:<8} {}{}", prefix, san, self.cursor.fen(), clocks);

        if let Some(threshold) = self.stop_threshold {
            match self.cursor.evaluation_drop(threshold) {
                Ok(Some(fen)) => {
                    println!("evaluation swing after {}; position before it: {}", san, fen);
                    return ControlFlow::Break(());
                }
                Ok(None) => {}
                Err(err) => {
                    eprintln!("game {}: {}", self.number, err);
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    }
}

struct WorkerFeed<'a> {
    worker: &'a mut WorkerClient,
    stop_threshold: Option<f64>,
}

impl GameFeed for WorkerFeed<'_> {
    type Target = TerminalBoard;

    async fn prepare(&mut self, index: usize) -> Option<PreparedGame<TerminalBoard>> {
        let payload = match self.worker.load_game(index).await {
            Ok(payload) => payload,
            Err(err) => {
                eprintln!("game {}: {}", index + 1, err);
                return None;
            }
        };
        if let Some(reasons) = &payload.error {
            eprintln!("game {} could not be parsed: {}", index + 1, reasons);
            eprintln!("{}", payload.pgn);
            return None;
        }

        println!("--- game {} ({} plies)", index + 1, payload.moves.len());
        let think_times = if payload.think_times.len() == payload.moves.len() {
            payload.think_times.clone()
        } else {
            vec![None; payload.moves.len()]
        };
        Some(PreparedGame {
            think_times,
            target: TerminalBoard {
                number: index + 1,
                cursor: GameCursor::from(payload),
                stop_threshold: self.stop_threshold,
            },
        })
    }
}

fn print_archives(year: Option<i32>) {
    let today = chrono::Local::now().date_naive();
    match year {
        None => {
            let (year, month) = default_month(today);
            println!("{}", broadcast_archive_url(year, month));
        }
        Some(year) => {
            for month in available_months(year, today) {
                println!("{}", broadcast_archive_url(year, month));
            }
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if let Some(year) = cli.archives {
        print_archives(year);
        return Ok(());
    }

    let pattern = cli.pattern.as_deref().ok_or(CliError::NoSource)?;
    let compression = cli.zstd.then_some(CompressionMode::Zstd);
    let blob = read_source(pattern, compression)?;

    let mut worker = WorkerClient::spawn()?;
    let summary = worker.load(blob).await?;
    let matches = worker.filter(cli.criteria()).await?;

    println!("{} games loaded, {} match", summary.count, matches.len());
    for &index in &matches {
        let meta = &summary.metadata[index];
        let speed = meta
            .time_control
            .as_deref()
            .and_then(categorize_timecontrol)
            .map(|category| format!("  [{}]", category))
            .unwrap_or_default();
        println!(
            "{:>5}  {} - {}  {}{}",
            meta.number, meta.white, meta.black, meta.result, speed
        );
    }
    if cli.list || matches.is_empty() {
        return Ok(());
    }

    let selection = match cli.game {
        Some(number) => {
            let index = number.checked_sub(1).filter(|i| matches.contains(i));
            vec![index.ok_or(CliError::NoSuchGame(number))?]
        }
        None if cli.all => matches,
        None => vec![matches[0]],
    };

    let config = cli.replay_config()?;
    let control = SequenceControl::new(&config);
    let mut feed = WorkerFeed {
        worker: &mut worker,
        stop_threshold: config
            .stop_on_error
            .then_some(config.stop_on_error_threshold),
    };
    let report = run_sequence(&mut feed, &selection, &config, &control).await;

    println!(
        "replayed {} game(s), skipped {}",
        report.played.len(),
        report.skipped.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    log::init();
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("pgn-replay: {}", err);
            ExitCode::FAILURE
        }
    }
}
