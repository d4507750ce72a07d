use super::scheduler::{Completion, ReplayOutcome, ReplayScheduler, ReplayTarget};
use super::timeouts;
use crate::chess::config::ReplayConfig;
use crate::chess::error::ReplayError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::sleep;
use tracing::{info, warn};

/// One game ready to be replayed inside a sequence.
pub struct PreparedGame<T> {
    /// One entry per ply; `None` where no clock data exists.
    pub think_times: Vec<Option<f64>>,
    pub target: T,
}

/// Supplies the games of a sequence, one at a time and in order.
pub trait GameFeed {
    type Target: ReplayTarget;

    /// Loads game `index`. `None` skips it.
    fn prepare(&mut self, index: usize) -> impl Future<Output = Option<PreparedGame<Self::Target>>>;
}

/// Stop switch shared between a running sequence and whoever may end it.
/// A control drives a single sequence; it is armed when created.
#[derive(Clone)]
pub struct SequenceControl {
    running: Arc<AtomicBool>,
    scheduler: Arc<Mutex<ReplayScheduler>>,
}

impl SequenceControl {
    pub fn new(config: &ReplayConfig) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            scheduler: Arc::new(Mutex::new(ReplayScheduler::new(config.completion_grace()))),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ends the sequence: the current replay is cancelled and no further
    /// game starts.
    pub fn stop(&self) {
        let mut scheduler = self.scheduler.lock().unwrap_or_else(PoisonError::into_inner);
        self.running.store(false, Ordering::SeqCst);
        scheduler.cancel();
    }

    /// `None` once stopped. The flag is read under the scheduler lock so a
    /// concurrent `stop` either sees this replay and cancels it, or wins
    /// and nothing is scheduled.
    fn schedule<T: ReplayTarget>(
        &self,
        timeouts: &[f64],
        target: T,
    ) -> Option<Result<Completion, ReplayError>> {
        let mut scheduler = self.scheduler.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_running() {
            return None;
        }
        Some(scheduler.schedule(timeouts, 0, target))
    }
}

/// Where a sequence was halted by its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopPoint {
    pub game: usize,
    pub ply: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceReport {
    /// Games replayed to the end (or to a stop), in order.
    pub played: Vec<usize>,
    /// Games the feed could not prepare or schedule.
    pub skipped: Vec<usize>,
    pub stopped_at: Option<StopPoint>,
    pub cancelled: bool,
}

/// Replays `indices` one after another with a pause between games. The
/// sequence ends early when `control` is stopped or a target breaks.
pub async fn run_sequence<F: GameFeed>(
    feed: &mut F,
    indices: &[usize],
    config: &ReplayConfig,
    control: &SequenceControl,
) -> SequenceReport {
    let mut report = SequenceReport::default();

    for (position, &index) in indices.iter().enumerate() {
        if !control.is_running() {
            report.cancelled = true;
            break;
        }

        let Some(game) = feed.prepare(index).await else {
            warn!(game = index, "game could not be prepared, skipping");
            report.skipped.push(index);
            continue;
        };

        sleep(config.game_load_settle()).await;

        let timeouts = timeouts(config, &game.think_times);
        let completion = match control.schedule(&timeouts, game.target) {
            None => {
                report.cancelled = true;
                break;
            }
            Some(Ok(completion)) => completion,
            Some(Err(err)) => {
                warn!(game = index, error = %err, "replay could not be scheduled, skipping");
                report.skipped.push(index);
                continue;
            }
        };

        match completion.wait().await {
            ReplayOutcome::Completed => report.played.push(index),
            ReplayOutcome::Cancelled => {
                report.cancelled = true;
                break;
            }
            ReplayOutcome::Stopped { ply } => {
                report.played.push(index);
                report.stopped_at = Some(StopPoint { game: index, ply });
                break;
            }
        }

        if position + 1 < indices.len() {
            sleep(config.inter_game_pause()).await;
        }
    }

    control.running.store(false, Ordering::SeqCst);
    info!(
        played = report.played.len(),
        skipped = report.skipped.len(),
        cancelled = report.cancelled,
        "replay sequence finished"
    );
    report
}
