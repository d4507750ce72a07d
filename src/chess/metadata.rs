use super::types::GameMetadata;
use regex::Regex;
use std::sync::LazyLock;

pub const UNKNOWN_PLAYER: &str = "Unknown";
pub const UNKNOWN_RESULT: &str = "*";
pub const DRAW_GLYPH: &str = "½-½";

/// Tags read by the extractor, in the order of `TAG_PATTERNS`.
#[derive(Clone, Copy)]
enum Tag {
    White,
    Black,
    Result,
    WhiteElo,
    BlackElo,
    WhiteTitle,
    BlackTitle,
    Eco,
    TimeControl,
    Event,
    Variant,
}

const TAG_NAMES: [&str; 11] = [
    "White",
    "Black",
    "Result",
    "WhiteElo",
    "BlackElo",
    "WhiteTitle",
    "BlackTitle",
    "ECO",
    "TimeControl",
    "Event",
    "Variant",
];

static TAG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    TAG_NAMES.iter().map(|name| tag_pattern(name)).collect()
});

/// `[Name "value"]` with a non-empty value. The name must not run into a
/// longer tag name (`White` must not match `WhiteElo`).
fn tag_pattern(name: &str) -> Regex {
    Regex::new(&format!(r#"\[{}\s+"([^"]+)"\]"#, regex::escape(name)))
        .expect("escaped tag name forms a valid pattern")
}

fn tag<'a>(pgn: &'a str, which: Tag) -> Option<&'a str> {
    TAG_PATTERNS[which as usize]
        .captures(pgn)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn variant(pgn: &str) -> Option<&str> {
    tag(pgn, Tag::Variant)
}

pub fn time_control(pgn: &str) -> Option<&str> {
    tag(pgn, Tag::TimeControl)
}

fn parse_elo(raw: Option<&str>) -> Option<u32> {
    raw?.trim().parse::<u32>().ok()
}

fn display_name(name: Option<&str>, title: Option<&str>, elo: Option<u32>) -> String {
    let mut out = String::new();
    if let Some(title) = title {
        out.push_str(title);
        out.push(' ');
    }
    out.push_str(name.unwrap_or(UNKNOWN_PLAYER));
    if let Some(elo) = elo {
        out.push_str(&format!(" ({})", elo));
    }
    out
}

pub fn display_result(raw: &str) -> String {
    match raw {
        "1/2-1/2" => DRAW_GLYPH.to_string(),
        other => other.to_string(),
    }
}

/// Builds the display metadata of one game from its tag pairs.
pub fn extract(pgn: &str, index: usize) -> GameMetadata {
    let white_elo = parse_elo(tag(pgn, Tag::WhiteElo));
    let black_elo = parse_elo(tag(pgn, Tag::BlackElo));

    GameMetadata {
        number: index + 1,
        white: display_name(tag(pgn, Tag::White), tag(pgn, Tag::WhiteTitle), white_elo),
        black: display_name(tag(pgn, Tag::Black), tag(pgn, Tag::BlackTitle), black_elo),
        result: display_result(tag(pgn, Tag::Result).unwrap_or(UNKNOWN_RESULT)),
        white_elo: white_elo.unwrap_or(0),
        black_elo: black_elo.unwrap_or(0),
        eco: tag(pgn, Tag::Eco).map(str::to_string),
        time_control: tag(pgn, Tag::TimeControl).map(str::to_string),
        event: tag(pgn, Tag::Event).map(str::to_string),
    }
}
