use super::clock::{ClockTimeline, reconstruct_for_game};
use super::error::{ErrorAccumulator, GameLoadError, ParseError};
use super::moves::{has_move_material, movetext, play_line, strip_annotations, tokenize};
use super::types::{GameRecord, MoveList};
use super::visitor::{StrictGame, parse_mainline, parse_strict};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

static EVAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[%eval\s+([^\]\s]+)").unwrap());

/// Text rewrites applied, in order, before the strict parse is retried.
static REWRITES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // Move annotation clutter: `e4!?`, `Nf3!!`.
        (r"([A-Za-z0-9+#=])[!?]+", "$1"),
        // Adjacent comments become one.
        (r"\}\s*\{", " "),
        // One tag pair per line.
        (r"\]\s*\[", "]\n["),
        // Movetext glued to the last tag pair.
        (r#"(\[[A-Za-z0-9_]+\s+"[^"]*"\])[ \t]+([^\s\[])"#, "$1\n\n$2"),
        // Black move numbers: `12...`. Replaced by a space so the
        // neighbouring tokens stay apart.
        (r"\d+\.\.\.", " "),
        // Numeric annotation glyphs.
        (r"\$\d+", " "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

/// Which parser produced a loaded game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Strict,
    Normalized,
    Mainline,
    Stripped,
}

impl Layer {
    pub const ALL: [Layer; 4] = [
        Layer::Strict,
        Layer::Normalized,
        Layer::Mainline,
        Layer::Stripped,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Strict => "strict",
            Layer::Normalized => "normalized",
            Layer::Mainline => "mainline",
            Layer::Stripped => "stripped",
        }
    }

    fn attempt(self, pgn: &str) -> Result<ParsedLine, ParseError> {
        match self {
            Layer::Strict => parse_strict(pgn).map(|game| ParsedLine::from_strict(game, pgn)),
            Layer::Normalized => {
                let normalized = normalize(pgn);
                parse_strict(&normalized).map(|game| ParsedLine::from_strict(game, &normalized))
            }
            Layer::Mainline => parse_mainline(pgn).map(|game| ParsedLine {
                moves: game.moves,
                ply_comments: game.comments,
                text: pgn.to_string(),
            }),
            Layer::Stripped => {
                let text = strip_comments_and_variations(pgn);
                let moves = tokenize(&text);
                if moves.is_empty() && has_move_material(&text) {
                    return Err(ParseError::NoMoves);
                }
                play_line(&moves)?;
                Ok(ParsedLine {
                    moves,
                    ply_comments: Vec::new(),
                    text,
                })
            }
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one successful layer.
struct ParsedLine {
    moves: MoveList,
    /// Comment text after each ply; empty when the layer keeps no comments.
    ply_comments: Vec<String>,
    /// The text the layer actually parsed.
    text: String,
}

impl ParsedLine {
    /// Attaches comments to plies through the position they follow, so a
    /// comment finds its ply even when move numbering is irregular.
    fn from_strict(game: StrictGame, text: &str) -> Self {
        let mut by_position: HashMap<&str, String> = HashMap::new();
        for comment in &game.comments {
            let slot = by_position.entry(comment.fen.as_str()).or_default();
            if !slot.is_empty() {
                slot.push(' ');
            }
            slot.push_str(&comment.text);
        }

        let ply_comments = game
            .fens
            .iter()
            .map(|fen| by_position.get(fen.as_str()).cloned().unwrap_or_default())
            .collect();

        Self {
            moves: game.moves,
            ply_comments,
            text: text.to_string(),
        }
    }
}

/// A game ready for replay.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedGame {
    pub index: usize,
    pub moves: MoveList,
    /// `[%eval]` value per ply, parallel to `moves`. Empty when the layer
    /// that succeeded keeps no comments.
    pub evaluations: Vec<Option<String>>,
    pub clocks: ClockTimeline,
    /// Text the moves were read from, after any normalization.
    pub pgn: String,
    pub layer: Layer,
}

/// Applies the text rewrites used by the normalized layer.
pub fn normalize(pgn: &str) -> String {
    let mut text = pgn.trim().replace("\r\n", "\n");
    for (pattern, replacement) in REWRITES.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    separate_header(&text)
}

/// Guarantees one blank line between the tag pairs and the movetext.
fn separate_header(text: &str) -> String {
    let body = movetext(text);
    let header = &text[..text.len() - body.len()];
    if header.trim().is_empty() {
        return body.to_string();
    }
    format!("{}\n\n{}", header.trim_end(), body.trim_start())
}

/// Tag pairs plus the bare main line.
pub fn strip_comments_and_variations(pgn: &str) -> String {
    let body = movetext(pgn);
    let header = &pgn[..pgn.len() - body.len()];
    format!("{}\n\n{}", header.trim_end(), strip_annotations(body))
        .trim()
        .to_string()
}

pub fn evaluation(comment: &str) -> Option<String> {
    EVAL.captures(comment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Comments for clock reading when the winning layer kept none: a syntax
/// walk of the original text, used only when it agrees on the ply count.
fn fallback_comments(raw: &str, plies: usize) -> Vec<String> {
    match parse_mainline(raw) {
        Ok(game) if game.moves.len() == plies => game.comments,
        _ => Vec::new(),
    }
}

/// Tries each layer in order and returns the first success. Earlier
/// failures are only logged; when every layer fails their reasons are
/// joined into the error.
pub fn load_game(record: &GameRecord) -> Result<LoadedGame, GameLoadError> {
    let raw = record.raw_pgn.as_str();
    let mut errors = ErrorAccumulator::default();

    for layer in Layer::ALL {
        match layer.attempt(raw) {
            Ok(parsed) => {
                debug!(game = record.index, %layer, plies = parsed.moves.len(), "game loaded");
                return Ok(finish(record.index, raw, layer, parsed));
            }
            Err(err) => {
                debug!(game = record.index, %layer, error = %err, "parser layer failed");
                errors.push(&format!("{}: {}", layer, err));
            }
        }
    }

    Err(GameLoadError {
        reasons: errors.take().unwrap_or_default(),
        raw_pgn: raw.to_string(),
    })
}

fn finish(index: usize, raw: &str, layer: Layer, parsed: ParsedLine) -> LoadedGame {
    let plies = parsed.moves.len();
    let evaluations: Vec<Option<String>> = if parsed.ply_comments.is_empty() {
        Vec::new()
    } else {
        parsed
            .ply_comments
            .iter()
            .map(|comment| evaluation(comment))
            .collect()
    };

    let clocks = if parsed.ply_comments.is_empty() {
        reconstruct_for_game(raw, &fallback_comments(raw, plies), plies)
    } else {
        reconstruct_for_game(raw, &parsed.ply_comments, plies)
    };

    LoadedGame {
        index,
        moves: parsed.moves,
        evaluations,
        clocks,
        pgn: parsed.text,
        layer,
    }
}
