use super::error::ParseError;
use super::types::MoveList;
use regex::Regex;
use shakmaty::fen::Fen;
use shakmaty::{Chess, EnPassantMode, Move, Position, san::SanPlus};
use std::sync::LazyLock;

static MOVE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.+").unwrap());
static NUMERIC_NAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\d+").unwrap());
static SAN_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"[NBRQK][a-h]?[1-8]?x?[a-h][1-8]",
        r"|[a-h](?:x[a-h])?[1-8](?:=?[NBRQ])?",
        r"|O-O(?:-O)?",
        r"|0-0(?:-0)?",
        r")[+#]?$"
    ))
    .unwrap()
});

pub const RESULT_TOKENS: [&str; 5] = ["1-0", "0-1", "1/2-1/2", "½-½", "*"];

fn is_tag_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.contains('"')
}

/// Movetext part of one game: everything after the run of tag lines and the
/// blank line that ends it, or from the first non-tag line when there is no
/// blank separator. Inline `[%clk ...]` annotations never end the header.
pub fn movetext(game: &str) -> &str {
    let mut offset = 0;
    let mut seen_tag = false;

    for line in game.split_inclusive('\n') {
        if is_tag_line(line) {
            seen_tag = true;
            offset += line.len();
            continue;
        }
        if line.trim().is_empty() {
            offset += line.len();
            if seen_tag {
                break;
            }
            continue;
        }
        break;
    }

    &game[offset..]
}

/// Removes `{...}` comments, `(...)` variations (nested), and `;` comments
/// running to end of line. Runs of whitespace collapse to one space.
pub fn strip_annotations(movetext: &str) -> String {
    let mut result = String::with_capacity(movetext.len());
    let mut brace_depth = 0usize;
    let mut paren_depth = 0usize;
    let mut in_line_comment = false;
    let mut prev_was_space = true;

    let push_space = |result: &mut String, prev_was_space: &mut bool| {
        if !*prev_was_space {
            result.push(' ');
            *prev_was_space = true;
        }
    };

    for ch in movetext.chars() {
        if in_line_comment {
            if ch == '\n' {
                in_line_comment = false;
                push_space(&mut result, &mut prev_was_space);
            }
            continue;
        }

        match ch {
            '{' => {
                brace_depth += 1;
                push_space(&mut result, &mut prev_was_space);
            }
            '}' if brace_depth > 0 => {
                brace_depth -= 1;
            }
            _ if brace_depth > 0 => {}
            '(' => {
                paren_depth += 1;
                push_space(&mut result, &mut prev_was_space);
            }
            ')' if paren_depth > 0 => {
                paren_depth -= 1;
            }
            _ if paren_depth > 0 => {}
            ';' => {
                in_line_comment = true;
            }
            c if c.is_whitespace() => {
                push_space(&mut result, &mut prev_was_space);
            }
            c => {
                prev_was_space = false;
                result.push(c);
            }
        }
    }

    result.trim().to_string()
}

/// `true` for SAN-shaped tokens: piece or pawn moves, captures, promotions,
/// castling, each with an optional check or mate marker.
pub fn is_san_shaped(token: &str) -> bool {
    SAN_SHAPE.is_match(token)
}

fn clean_token(token: &str) -> Option<&str> {
    if token == "." || RESULT_TOKENS.contains(&token) {
        return None;
    }
    let token = token.trim_end_matches(['!', '?']);
    is_san_shaped(token).then_some(token)
}

/// Fast main-line move extraction. Best effort: tokens that do not look like
/// SAN are dropped rather than reported, so the rules engine stays the
/// source of truth for full-fidelity parsing.
pub fn tokenize(game: &str) -> MoveList {
    let stripped = strip_annotations(movetext(game));
    let without_numbers = MOVE_NUMBER.replace_all(&stripped, " ");
    let without_nags = NUMERIC_NAG.replace_all(&without_numbers, " ");

    without_nags
        .split_whitespace()
        .filter_map(clean_token)
        .map(str::to_string)
        .collect()
}

/// `true` when the movetext holds anything besides annotations and a result.
pub fn has_move_material(game: &str) -> bool {
    strip_annotations(movetext(game))
        .split_whitespace()
        .any(|token| !RESULT_TOKENS.contains(&token))
}

/// Resolves one SAN token against `pos`. `ply` is 1-based and only used for
/// the error.
pub fn resolve_san(pos: &Chess, token: &str, ply: usize) -> Result<Move, ParseError> {
    let san: SanPlus = token
        .parse()
        .map_err(|_| ParseError::BadToken(token.to_string()))?;
    san.san.to_move(pos).map_err(|_| ParseError::IllegalMove {
        san: token.to_string(),
        ply,
    })
}

/// Plays `moves` from the initial position, stopping at the first token
/// that is unparsable or illegal.
pub fn play_line<S: AsRef<str>>(moves: &[S]) -> Result<Chess, ParseError> {
    let mut pos = Chess::default();
    for (i, token) in moves.iter().enumerate() {
        let m = resolve_san(&pos, token.as_ref(), i + 1)?;
        pos.play_unchecked(m);
    }
    Ok(pos)
}

pub fn fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// `true` when `moves` starts with every token of `prefix`, in order.
pub fn matches_prefix<S: AsRef<str>>(moves: &[S], prefix: &[S]) -> bool {
    if prefix.len() > moves.len() {
        return false;
    }

    prefix
        .iter()
        .zip(moves.iter())
        .all(|(p, m)| p.as_ref() == m.as_ref())
}

/// Cheap gate before tokenizing: every token `tokenize` returns is a
/// substring of the raw game text, so a miss here can never hide a match.
pub fn may_contain_move(raw_pgn: &str, first_target: &str) -> bool {
    raw_pgn.contains(first_target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(game: &str) -> Vec<String> {
        tokenize(game).into_vec()
    }

    #[test]
    fn test_tokenize_complex() {
        let input = "1. e4! {Best by test} (1. d4 d5) e5?? $1 2. Nf3";
        assert_eq!(tokens(input), ["e4", "e5", "Nf3"]);
    }

    #[test]
    fn test_tokenize_nag_symbols() {
        assert_eq!(tokens("1. e4!"), ["e4"]);
        assert_eq!(tokens("1. e4??"), ["e4"]);
        assert_eq!(tokens("1. e4!?"), ["e4"]);
        assert_eq!(tokens("1. e4 $10 e5"), ["e4", "e5"]);
    }

    #[test]
    fn test_tokenize_with_headers_and_clock_comments() {
        let game = r#"[Event "Rated Blitz game"]
[White "PlayerA"]
[Black "PlayerB"]
[Result "0-1"]

1. e4 { [%clk 0:05:00] } 1... e5 { [%clk 0:05:00] } 2. Nf3 { [%clk 0:04:59] } 2... Nc6 { [%clk 0:04:59] } 0-1"#;
        assert_eq!(tokens(game), ["e4", "e5", "Nf3", "Nc6"]);
    }

    #[test]
    fn test_movetext_ignores_bracketed_annotations_after_header() {
        let game = "[Event \"A\"]\n[Site \"B\"]\n\n1. d4 { [%eval 0.25] [%clk 1:30:43] } Nf6 { [%eval 0.22] }";
        assert!(movetext(game).starts_with("1. d4"));
        assert_eq!(tokens(game), ["d4", "Nf6"]);
    }

    #[test]
    fn test_movetext_without_blank_separator() {
        let game = "[Event \"A\"]\n[White \"W\"]\n1. e4 e5 *";
        assert_eq!(movetext(game), "1. e4 e5 *");
    }

    #[test]
    fn test_movetext_of_bare_movetext() {
        assert_eq!(movetext("1. c4 c5"), "1. c4 c5");
    }

    #[test]
    fn test_tokenize_drops_stray_bracket_fragments() {
        let game = r#"[Event "A"] 1. e4 e5 1-0"#;
        assert_eq!(tokens(game), ["e4", "e5"]);
    }

    #[test]
    fn test_tokenize_semicolon_comments() {
        let game = "1. e4 ; king's pawn\ne5 2. Nf3";
        assert_eq!(tokens(game), ["e4", "e5", "Nf3"]);
    }

    #[test]
    fn test_tokenize_nested_variations() {
        let game = "1. e4 (1. d4 (1. c4 c5) d5) e5 2. Nf3";
        assert_eq!(tokens(game), ["e4", "e5", "Nf3"]);
    }

    #[test]
    fn test_tokenize_castling_promotion_and_checks() {
        let game = "1. O-O O-O-O+ 2. exd8=Q+ Kxd8 3. a8Q Qxh2# 4. 0-0";
        assert_eq!(
            tokens(game),
            ["O-O", "O-O-O+", "exd8=Q+", "Kxd8", "a8Q", "Qxh2#", "0-0"]
        );
    }

    #[test]
    fn test_tokenize_results_removed() {
        assert_eq!(tokens("1. e4 e5 1/2-1/2"), ["e4", "e5"]);
        assert_eq!(tokens("1. e4 *"), ["e4"]);
        assert!(tokens("").is_empty());
    }

    #[test]
    fn test_strip_annotations_collapses_whitespace() {
        assert_eq!(strip_annotations("  1. e4  {c}   e5  "), "1. e4 e5");
        assert_eq!(strip_annotations("{only}"), "");
        assert_eq!(strip_annotations("1.e4{x}e5"), "1.e4 e5");
    }

    #[test]
    fn test_san_shape() {
        assert!(is_san_shaped("Nbd7"));
        assert!(is_san_shaped("R1e2"));
        assert!(is_san_shaped("Qh4xe1"));
        assert!(!is_san_shaped("\"A\"]"));
        assert!(!is_san_shaped("[%clk"));
        assert!(!is_san_shaped("e9"));
    }

    #[test]
    fn test_matches_prefix() {
        let game = ["e4", "e5", "Nf3"];
        assert!(matches_prefix(&game, &["e4", "e5"]));
        assert!(!matches_prefix(&game, &["e4", "c5"]));
        assert!(matches_prefix(&game, &game));
        assert!(!matches_prefix(&["e4"][..], &["e4", "e5"][..]));
        assert!(matches_prefix(&game, &[]));
    }

    #[test]
    fn test_has_move_material() {
        assert!(has_move_material("[Event \"A\"]\n\n1. e4 *"));
        assert!(!has_move_material("[Event \"A\"]\n\n{no moves} *"));
        assert!(!has_move_material("[Event \"A\"]\n[Result \"*\"]\n\n"));
    }

    #[test]
    fn test_play_line_reports_illegal_ply() {
        let pos = play_line(&["e4", "e5", "Nf3"]).unwrap();
        assert_eq!(
            fen(&pos),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );

        let err = play_line(&["e4", "e5", "Ke3"]).unwrap_err();
        assert_eq!(
            err,
            ParseError::IllegalMove {
                san: "Ke3".to_string(),
                ply: 3
            }
        );
        assert!(matches!(
            play_line(&["zz9"]).unwrap_err(),
            ParseError::BadToken(_)
        ));
    }

    #[test]
    fn test_precheck_never_misses_tokenized_move() {
        let raw = "[Event \"A\"]\n\n1.e4!? e5 2.Nf3";
        for token in tokenize(raw) {
            assert!(may_contain_move(raw, &token));
        }
        assert!(!may_contain_move(raw, "d4"));
    }
}
