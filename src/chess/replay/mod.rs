//! Replay timing: per-ply timeouts under each `ReplayMode`, the delays a
//! schedule fires at, the scheduler itself, and multi-game sequencing.

mod scheduler;
mod sequence;

pub use scheduler::{Completion, ReplayOutcome, ReplayScheduler, ReplayState, ReplayTarget};
pub use sequence::{
    GameFeed, PreparedGame, SequenceControl, SequenceReport, StopPoint, run_sequence,
};

use super::config::{ReplayConfig, ReplayMode};
use super::error::ReplayError;
use std::time::Duration;

const EPSILON: f64 = 1e-9;

/// Cumulative seconds from game start at which each ply is shown.
/// `think_times` has one entry per ply; `None` falls back to `fixedSeconds`.
pub fn timeouts(config: &ReplayConfig, think_times: &[Option<f64>]) -> Vec<f64> {
    let fixed = config.fixed_seconds;
    let gaps: Vec<f64> = match config.mode {
        ReplayMode::Fixed => vec![fixed; think_times.len()],
        ReplayMode::Realtime => think_times.iter().map(|t| t.unwrap_or(fixed)).collect(),
        ReplayMode::Proportional => {
            let recorded: Vec<f64> = think_times.iter().map(|t| t.unwrap_or(fixed)).collect();
            fit_gaps(
                &recorded,
                config.proportional_minutes * 60.0,
                config.min_seconds_between_moves,
            )
        }
    };

    gaps.iter()
        .scan(0.0, |elapsed, gap| {
            *elapsed += gap;
            Some(*elapsed)
        })
        .collect()
}

/// Rescales `recorded` to sum to `target`, with every gap at least `min_gap`.
/// Raising short gaps to the floor is paid for by shrinking the others, so
/// the total stays within `target` whenever `len * min_gap` fits in it.
pub fn fit_gaps(recorded: &[f64], target: f64, min_gap: f64) -> Vec<f64> {
    let total: f64 = recorded.iter().sum();
    let scale = if total > 0.0 { target / total } else { 1.0 };
    let mut gaps: Vec<f64> = recorded.iter().map(|g| (g * scale).max(min_gap)).collect();

    if gaps.len() as f64 * min_gap > target {
        return gaps;
    }

    // Each pass either meets the target or pins one more gap to the floor.
    for _ in 0..gaps.len() {
        let excess: f64 = gaps.iter().sum::<f64>() - target;
        if excess <= EPSILON {
            break;
        }

        let free_sum: f64 = gaps.iter().filter(|&&g| g > min_gap + EPSILON).sum();
        if free_sum <= EPSILON {
            break;
        }

        let factor = (free_sum - excess) / free_sum;
        for gap in gaps.iter_mut().filter(|g| **g > min_gap + EPSILON) {
            *gap = (*gap * factor).max(min_gap);
        }
    }

    gaps
}

pub fn to_duration(seconds: f64) -> Duration {
    Duration::from_millis((seconds.max(0.0) * 1000.0).round() as u64)
}

/// Delays, relative to now, for plies `start_ply..timeouts.len()`. Resuming
/// mid-game measures from `timeouts[start_ply - 1]`.
pub fn plan(timeouts: &[f64], start_ply: usize) -> Result<Vec<Duration>, ReplayError> {
    if start_ply > timeouts.len() {
        return Err(ReplayError::StartOutOfRange {
            start: start_ply,
            total: timeouts.len(),
        });
    }

    let mut previous = 0.0;
    for (ply, &timeout) in timeouts.iter().enumerate() {
        if !timeout.is_finite() || timeout + EPSILON < previous {
            return Err(ReplayError::InvalidTimeout(ply));
        }
        previous = timeout;
    }

    let origin = match start_ply {
        0 => 0.0,
        n => timeouts[n - 1],
    };

    Ok(timeouts[start_ply..]
        .iter()
        .map(|&timeout| to_duration(timeout - origin))
        .collect())
}
