use super::metadata::time_control;
use super::timecontrol::first_period_seconds;
use super::types::ClockState;
use regex::Regex;
use std::sync::LazyLock;

static CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%clk\s+(?:(\d+):)?(\d+):(\d+(?:\.\d+)?)").unwrap()
});

/// Shortest think time ever reported, so no ply is scheduled at zero delay.
pub const MIN_THINK_SECONDS: f64 = 0.1;

/// Clock data derived from one game's `[%clk]` annotations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClockTimeline {
    /// Index 0 is the starting state, index `i + 1` the state after ply `i`.
    /// Empty when the game carries no clock annotation at all.
    pub history: Vec<ClockState>,
    /// Seconds spent on each ply; `None` where the ply has no annotation.
    pub think_times: Vec<Option<f64>>,
}

impl ClockTimeline {
    pub fn has_clocks(&self) -> bool {
        !self.history.is_empty()
    }
}

/// Remaining seconds in a `[%clk h:mm:ss]` or `[%clk m:ss]` annotation.
pub fn parse_clock(comment: &str) -> Option<f64> {
    let caps = CLOCK.captures(comment)?;
    let hours: f64 = match caps.get(1) {
        Some(h) => h.as_str().parse().ok()?,
        None => 0.0,
    };
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Starting clock from a `TimeControl` value; zero when the tag is missing
/// or unparsable.
pub fn initial_clock(time_control: Option<&str>) -> f64 {
    time_control
        .and_then(first_period_seconds)
        .map(|p| p.base_seconds as f64)
        .unwrap_or(0.0)
}

/// Rebuilds both clocks ply by ply. `ply_comments[i]` holds the comment
/// text following ply `i`; plies beyond its end count as unannotated.
pub fn reconstruct<S: AsRef<str>>(
    time_control: Option<&str>,
    ply_comments: &[S],
    plies: usize,
) -> ClockTimeline {
    let base = initial_clock(time_control);
    let mut state = ClockState {
        white: base,
        black: base,
    };
    let mut timeline = ClockTimeline {
        history: Vec::with_capacity(plies + 1),
        think_times: Vec::with_capacity(plies),
    };
    timeline.history.push(state);

    let mut annotated = false;
    for ply in 0..plies {
        let remaining = ply_comments
            .get(ply)
            .and_then(|comment| parse_clock(comment.as_ref()));

        let think = remaining.map(|now| {
            annotated = true;
            let side = if ply.is_multiple_of(2) {
                &mut state.white
            } else {
                &mut state.black
            };
            // The increment is not credited back.
            let spent = (*side - now).max(MIN_THINK_SECONDS);
            *side = now;
            spent
        });

        timeline.think_times.push(think);
        timeline.history.push(state);
    }

    if !annotated {
        timeline.history.clear();
    }
    timeline
}

/// Clock reconstruction for a whole game text, reading its `TimeControl`.
pub fn reconstruct_for_game<S: AsRef<str>>(
    pgn: &str,
    ply_comments: &[S],
    plies: usize,
) -> ClockTimeline {
    reconstruct(time_control(pgn), ply_comments, plies)
}

/// `h:mm:ss` from one hour up, `m:ss` below.
pub fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
