use super::error::ParseError;
use super::loader::LoadedGame;
use super::moves::{fen, resolve_san};
use super::types::{ClockState, MoveList};
use super::worker::GamePayload;
use shakmaty::{Chess, MoveList as LegalMoves, Position};

/// Pawn value given to a forced mate before the distance bonus.
const MATE_BASE: f64 = 20.0;
/// Evaluation, in pawns, at which the bar is full.
const BAR_RANGE: f64 = 5.0;

/// Pawns for a `[%eval]` value. `#n` mates map beyond any material score,
/// nearer mates further out; `#-n` mirrors that for Black.
pub fn parse_eval(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Some(mate) = raw.strip_prefix('#') {
        let n: i32 = mate.parse().ok()?;
        if n == 0 {
            return None;
        }
        let score = MATE_BASE + 10.0 / f64::from(n.unsigned_abs());
        return Some(if n > 0 { score } else { -score });
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// White's share of an evaluation bar, 0 to 100.
pub fn eval_bar_percent(raw: Option<&str>) -> f64 {
    let Some(raw) = raw.map(str::trim) else {
        return 50.0;
    };
    if let Some(mate) = raw.strip_prefix('#') {
        return match mate.parse::<i32>() {
            Ok(n) if n > 0 => 100.0,
            Ok(n) if n < 0 => 0.0,
            _ => 50.0,
        };
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => 50.0 + v.clamp(-BAR_RANGE, BAR_RANGE) / BAR_RANGE * 50.0,
        _ => 50.0,
    }
}

/// Whether the evaluation swing from the previous ply to `ply` exceeds
/// `threshold` pawns. Plies without a readable evaluation never trigger.
pub fn exceeds_swing(evaluations: &[Option<String>], ply: usize, threshold: f64) -> bool {
    if ply == 0 {
        return false;
    }
    let read = |i: usize| {
        evaluations
            .get(i)
            .and_then(|e| e.as_deref())
            .and_then(parse_eval)
    };
    match (read(ply), read(ply - 1)) {
        (Some(current), Some(previous)) => (current - previous).abs() > threshold,
        _ => false,
    }
}

/// Steps through one loaded game. Positions already visited are kept, so
/// moving backwards never replays the line.
#[derive(Debug, Clone)]
pub struct GameCursor {
    moves: MoveList,
    evaluations: Vec<Option<String>>,
    clock_history: Vec<ClockState>,
    /// `positions[i]` is the position after `i` plies.
    positions: Vec<Chess>,
    ply: usize,
}

impl GameCursor {
    pub fn new(
        moves: MoveList,
        evaluations: Vec<Option<String>>,
        clock_history: Vec<ClockState>,
    ) -> Self {
        Self {
            moves,
            evaluations,
            clock_history,
            positions: vec![Chess::default()],
            ply: 0,
        }
    }

    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    /// Plies applied so far; 0 at the initial position.
    pub fn current_ply(&self) -> usize {
        self.ply
    }

    pub fn is_at_end(&self) -> bool {
        self.ply == self.moves.len()
    }

    pub fn position(&self) -> &Chess {
        &self.positions[self.ply]
    }

    pub fn fen(&self) -> String {
        fen(self.position())
    }

    pub fn legal_moves(&self) -> LegalMoves {
        self.position().legal_moves()
    }

    pub fn start(&mut self) {
        self.ply = 0;
    }

    /// Applies the next move. `Ok(false)` at the end of the game.
    pub fn next(&mut self) -> Result<bool, ParseError> {
        if self.is_at_end() {
            return Ok(false);
        }
        self.reach(self.ply + 1)?;
        self.ply += 1;
        Ok(true)
    }

    /// Takes back one move. `false` at the initial position.
    pub fn prev(&mut self) -> bool {
        if self.ply == 0 {
            return false;
        }
        self.ply -= 1;
        true
    }

    /// Moves to the position after `ply` plies, clamped to the game length.
    /// On an illegal move the cursor stays where it was.
    pub fn jump_to(&mut self, ply: usize) -> Result<(), ParseError> {
        let target = ply.min(self.moves.len());
        self.reach(target)?;
        self.ply = target;
        Ok(())
    }

    pub fn end(&mut self) -> Result<(), ParseError> {
        self.jump_to(self.moves.len())
    }

    /// Position in which move `ply` (0-based) was played.
    pub fn fen_before(&mut self, ply: usize) -> Result<String, ParseError> {
        let target = ply.min(self.moves.len());
        self.reach(target)?;
        Ok(fen(&self.positions[target]))
    }

    /// Clocks after the current ply; `None` when the game has no clock data.
    pub fn clocks(&self) -> Option<ClockState> {
        self.clock_history.get(self.ply).copied()
    }

    /// Evaluation attached to the last applied move.
    pub fn current_evaluation(&self) -> Option<&str> {
        let last = self.ply.checked_sub(1)?;
        self.evaluations.get(last)?.as_deref()
    }

    /// Checks the evaluation swing of the last applied move. Returns the FEN
    /// before that move when the swing exceeds `threshold`.
    pub fn evaluation_drop(&mut self, threshold: f64) -> Result<Option<String>, ParseError> {
        let Some(last) = self.ply.checked_sub(1) else {
            return Ok(None);
        };
        if !exceeds_swing(&self.evaluations, last, threshold) {
            return Ok(None);
        }
        self.fen_before(last).map(Some)
    }

    /// Extends the position cache up to `target` plies.
    fn reach(&mut self, target: usize) -> Result<(), ParseError> {
        while self.positions.len() <= target {
            let done = self.positions.len() - 1;
            let mut pos = self.positions[done].clone();
            let m = resolve_san(&pos, &self.moves[done], done + 1)?;
            pos.play_unchecked(m);
            self.positions.push(pos);
        }
        Ok(())
    }
}

impl From<LoadedGame> for GameCursor {
    fn from(game: LoadedGame) -> Self {
        Self::new(game.moves, game.evaluations, game.clocks.history)
    }
}

impl From<GamePayload> for GameCursor {
    fn from(payload: GamePayload) -> Self {
        Self::new(
            MoveList::from_vec(payload.moves),
            payload.evaluations,
            payload.clock_history,
        )
    }
}
