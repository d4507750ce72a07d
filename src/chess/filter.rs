use super::moves::{matches_prefix, may_contain_move, tokenize};
use super::types::{GameMetadata, GameRecord, MoveList};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::info;

const DRAW_CATEGORY: &str = "draw";
const DRAW_FORMS: [&str; 3] = ["1/2-1/2", "½-½", "draw"];

/// One filter invocation's predicate inputs. Empty strings and zero ratings
/// mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub white: String,
    pub black: String,
    /// Comma-separated result categories: `1-0`, `0-1`, `draw`.
    pub result: String,
    /// Enables the move-prefix predicate.
    pub moves: bool,
    pub target_moves: Vec<String>,
    pub ignore_color: bool,
    pub min_white_rating: u32,
    pub min_black_rating: u32,
    pub max_white_rating: u32,
    pub max_black_rating: u32,
    pub eco: String,
    pub time_control: String,
    pub event: String,
}

impl FilterCriteria {
    /// The viewer's "cleared" filter form: both colours between 2000 and 3000.
    pub fn ui_defaults() -> Self {
        Self {
            min_white_rating: 2000,
            min_black_rating: 2000,
            max_white_rating: 3000,
            max_black_rating: 3000,
            ..Self::default()
        }
    }
}

/// Lazily tokenized move lists keyed by game index. Owned by whoever holds
/// the loaded games and cleared as a whole on every new load.
#[derive(Debug, Default)]
pub struct MoveCache {
    entries: HashMap<usize, MoveList>,
}

impl MoveCache {
    pub fn get_or_tokenize(&mut self, game: &GameRecord) -> &MoveList {
        self.entries
            .entry(game.index)
            .or_insert_with(|| tokenize(&game.raw_pgn))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_result(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    if DRAW_FORMS.contains(&lowered.as_str()) {
        DRAW_CATEGORY.to_string()
    } else {
        lowered
    }
}

/// Bounds applied to one player's rating. Zero means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct RatingBounds {
    min: u32,
    max: u32,
}

impl RatingBounds {
    fn admits(self, rating: u32) -> bool {
        (self.min == 0 || rating >= self.min) && (self.max == 0 || rating <= self.max)
    }
}

fn nonzero_min(a: u32, b: u32) -> u32 {
    match (a, b) {
        (0, other) | (other, 0) => other,
        (a, b) => a.min(b),
    }
}

/// A compiled `FilterCriteria`: lowercased needles and resolved bounds.
struct Matcher<'a> {
    white: String,
    black: String,
    results: Vec<String>,
    eco: String,
    event: String,
    time_control: &'a str,
    ignore_color: bool,
    white_bounds: RatingBounds,
    black_bounds: RatingBounds,
    target_moves: Option<&'a [String]>,
}

impl<'a> Matcher<'a> {
    fn new(criteria: &'a FilterCriteria) -> Self {
        let (white_bounds, black_bounds) = if criteria.ignore_color {
            // Both sides must clear the lower minimum and stay under the
            // higher maximum.
            let shared = RatingBounds {
                min: nonzero_min(criteria.min_white_rating, criteria.min_black_rating),
                max: criteria.max_white_rating.max(criteria.max_black_rating),
            };
            (shared, shared)
        } else {
            (
                RatingBounds {
                    min: criteria.min_white_rating,
                    max: criteria.max_white_rating,
                },
                RatingBounds {
                    min: criteria.min_black_rating,
                    max: criteria.max_black_rating,
                },
            )
        };

        let target_moves = (criteria.moves && !criteria.target_moves.is_empty())
            .then_some(criteria.target_moves.as_slice());

        Self {
            white: criteria.white.trim().to_lowercase(),
            black: criteria.black.trim().to_lowercase(),
            results: criteria
                .result
                .split(',')
                .map(normalize_result)
                .filter(|r| !r.is_empty())
                .collect(),
            eco: criteria.eco.trim().to_lowercase(),
            event: criteria.event.trim().to_lowercase(),
            time_control: criteria.time_control.trim(),
            ignore_color: criteria.ignore_color,
            white_bounds,
            black_bounds,
            target_moves,
        }
    }

    fn names_match(&self, meta: &GameMetadata) -> bool {
        let white = meta.white.to_lowercase();
        let black = meta.black.to_lowercase();
        let either = |needle: &str| white.contains(needle) || black.contains(needle);

        if self.ignore_color {
            (self.white.is_empty() || either(&self.white))
                && (self.black.is_empty() || either(&self.black))
        } else {
            (self.white.is_empty() || white.contains(&self.white))
                && (self.black.is_empty() || black.contains(&self.black))
        }
    }

    fn result_matches(&self, meta: &GameMetadata) -> bool {
        if self.results.is_empty() {
            return true;
        }
        let category = normalize_result(&meta.result);
        self.results.iter().any(|wanted| *wanted == category)
    }

    fn tags_match(&self, meta: &GameMetadata) -> bool {
        let contains = |needle: &str, value: Option<&String>| {
            needle.is_empty() || value.is_some_and(|v| v.to_lowercase().contains(needle))
        };

        contains(&self.eco, meta.eco.as_ref())
            && contains(&self.event, meta.event.as_ref())
            && (self.time_control.is_empty()
                || meta.time_control.as_deref() == Some(self.time_control))
    }

    fn ratings_match(&self, meta: &GameMetadata) -> bool {
        self.white_bounds.admits(meta.white_elo) && self.black_bounds.admits(meta.black_elo)
    }

    fn moves_match(&self, game: &GameRecord, cache: &mut MoveCache) -> bool {
        let Some(target) = self.target_moves else {
            return true;
        };
        if !may_contain_move(&game.raw_pgn, &target[0]) {
            return false;
        }
        matches_prefix(cache.get_or_tokenize(game).as_slice(), target)
    }
}

/// Indices of every game satisfying `criteria`, highest combined rating
/// first. Ties keep load order. `games` and `metadata` are parallel slices.
pub fn filter(
    criteria: &FilterCriteria,
    games: &[GameRecord],
    metadata: &[GameMetadata],
    cache: &mut MoveCache,
) -> Vec<usize> {
    let matcher = Matcher::new(criteria);

    let mut matches: Vec<(usize, u64)> = games
        .iter()
        .zip(metadata)
        .filter(|(game, meta)| {
            matcher.names_match(meta)
                && matcher.result_matches(meta)
                && matcher.tags_match(meta)
                && matcher.ratings_match(meta)
                && matcher.moves_match(game, cache)
        })
        .map(|(game, meta)| (game.index, meta.rating_sum()))
        .collect();

    matches.sort_by_key(|&(_, rating_sum)| Reverse(rating_sum));

    info!(
        matched = matches.len(),
        total = games.len(),
        cached_move_lists = cache.len(),
        "filter applied"
    );

    matches.into_iter().map(|(index, _)| index).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::metadata::extract;
    use crate::chess::reader::split;

    const GAMES: &str = r#"[Event "Club Open"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]
[WhiteElo "1800"]
[BlackElo "1700"]
[ECO "C50"]
[TimeControl "180+0"]

1. e4 e5 2. Nf3 Nc6 3. Bc4 1-0

[Event "Titled Arena"]
[White "Carol"]
[Black "Alice"]
[Result "1/2-1/2"]
[WhiteElo "2500"]
[BlackElo "2450"]
[ECO "B20"]
[TimeControl "60+0"]

1. e4 c5 2. Nf3 1/2-1/2

[Event "Club Open"]
[White "Dave"]
[Black "Erin"]
[Result "0-1"]
[WhiteElo "2100"]
[BlackElo "1900"]
[ECO "D02"]

1. d4 d5 2. Nf3 0-1
"#;

    fn fixture() -> (Vec<GameRecord>, Vec<GameMetadata>) {
        let games = split(GAMES);
        let metadata = games.iter().map(|g| extract(&g.raw_pgn, g.index)).collect();
        (games, metadata)
    }

    fn run(criteria: &FilterCriteria) -> Vec<usize> {
        let (games, metadata) = fixture();
        filter(criteria, &games, &metadata, &mut MoveCache::default())
    }

    #[test]
    fn test_empty_criteria_returns_all_sorted_by_rating_sum() {
        assert_eq!(run(&FilterCriteria::default()), vec![1, 2, 0]);
    }

    #[test]
    fn test_equal_rating_sums_keep_load_order() {
        let blob = "[Event \"A\"]\n\n1. e4 *\n\n[Event \"B\"]\n\n1. d4 *\n\n[Event \"C\"]\n\n1. c4 *";
        let games = split(blob);
        let metadata: Vec<_> = games.iter().map(|g| extract(&g.raw_pgn, g.index)).collect();
        let result = filter(
            &FilterCriteria::default(),
            &games,
            &metadata,
            &mut MoveCache::default(),
        );
        assert_eq!(result, vec![0, 1, 2]);
    }

    #[test]
    fn test_name_match_respects_colour() {
        let criteria = FilterCriteria {
            white: "alice".to_string(),
            ..Default::default()
        };
        assert_eq!(run(&criteria), vec![0]);
    }

    #[test]
    fn test_name_match_ignore_colour_checks_both_sides() {
        let criteria = FilterCriteria {
            white: "ALICE".to_string(),
            ignore_color: true,
            ..Default::default()
        };
        assert_eq!(run(&criteria), vec![1, 0]);

        let both = FilterCriteria {
            white: "bob".to_string(),
            black: "alice".to_string(),
            ignore_color: true,
            ..Default::default()
        };
        assert_eq!(run(&both), vec![0]);
    }

    #[test]
    fn test_result_categories_are_ored() {
        let draws = FilterCriteria {
            result: "draw".to_string(),
            ..Default::default()
        };
        assert_eq!(run(&draws), vec![1]);

        let decisive = FilterCriteria {
            result: "1-0, 0-1".to_string(),
            ..Default::default()
        };
        assert_eq!(run(&decisive), vec![2, 0]);

        let glyph = FilterCriteria {
            result: "1/2-1/2".to_string(),
            ..Default::default()
        };
        assert_eq!(run(&glyph), vec![1]);
    }

    #[test]
    fn test_eco_event_and_time_control() {
        let eco = FilterCriteria {
            eco: "c5".to_string(),
            ..Default::default()
        };
        assert_eq!(run(&eco), vec![0]);

        let event = FilterCriteria {
            event: "club".to_string(),
            ..Default::default()
        };
        assert_eq!(run(&event), vec![2, 0]);

        // The third game has no TimeControl tag, so it never matches.
        let tc = FilterCriteria {
            time_control: "180+0".to_string(),
            ..Default::default()
        };
        assert_eq!(run(&tc), vec![0]);

        let partial_tc = FilterCriteria {
            time_control: "180".to_string(),
            ..Default::default()
        };
        assert!(run(&partial_tc).is_empty());
    }

    #[test]
    fn test_rating_bounds_per_colour() {
        let criteria = FilterCriteria {
            min_white_rating: 2000,
            max_black_rating: 2000,
            ..Default::default()
        };
        assert_eq!(run(&criteria), vec![2]);
    }

    #[test]
    fn test_ignore_colour_single_minimum_is_used_directly() {
        let criteria = FilterCriteria {
            ignore_color: true,
            min_white_rating: 2000,
            min_black_rating: 0,
            ..Default::default()
        };
        assert_eq!(Matcher::new(&criteria).white_bounds.min, 2000);
        assert_eq!(Matcher::new(&criteria).black_bounds.min, 2000);
        assert_eq!(run(&criteria), vec![1]);
    }

    // Intentionally asymmetric: the lower minimum and the higher maximum
    // apply to both players.
    #[test]
    fn test_ignore_colour_uses_min_of_mins_and_max_of_maxes() {
        let criteria = FilterCriteria {
            ignore_color: true,
            min_white_rating: 2400,
            min_black_rating: 1850,
            max_white_rating: 2200,
            max_black_rating: 2600,
            ..Default::default()
        };
        let matcher = Matcher::new(&criteria);
        assert_eq!(matcher.white_bounds, RatingBounds { min: 1850, max: 2600 });
        assert_eq!(run(&criteria), vec![1, 2]);
    }

    #[test]
    fn test_ui_defaults_bounds() {
        let criteria = FilterCriteria::ui_defaults();
        assert_eq!(criteria.min_white_rating, 2000);
        assert_eq!(criteria.max_black_rating, 3000);
        assert_eq!(run(&criteria), vec![1]);
    }

    #[test]
    fn test_move_prefix() {
        let criteria = FilterCriteria {
            moves: true,
            target_moves: vec!["e4".to_string(), "e5".to_string()],
            ..Default::default()
        };
        assert_eq!(run(&criteria), vec![0]);

        let sicilian = FilterCriteria {
            moves: true,
            target_moves: vec!["e4".to_string(), "c5".to_string()],
            ..Default::default()
        };
        assert_eq!(run(&sicilian), vec![1]);
    }

    #[test]
    fn test_move_prefix_disabled_flag_ignores_targets() {
        let criteria = FilterCriteria {
            moves: false,
            target_moves: vec!["h4".to_string()],
            ..Default::default()
        };
        assert_eq!(run(&criteria).len(), 3);
    }

    #[test]
    fn test_precheck_skips_tokenizing_excluded_games() {
        let (games, metadata) = fixture();
        let mut cache = MoveCache::default();
        let criteria = FilterCriteria {
            moves: true,
            target_moves: vec!["d4".to_string()],
            ..Default::default()
        };

        assert_eq!(filter(&criteria, &games, &metadata, &mut cache), vec![2]);
        assert_eq!(cache.len(), 1);

        // A second pass reuses the cached entry.
        assert_eq!(filter(&criteria, &games, &metadata, &mut cache), vec![2]);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_prefix_longer_than_game_never_matches() {
        let criteria = FilterCriteria {
            moves: true,
            target_moves: ["d4", "d5", "Nf3", "Nf6", "c4"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        };
        assert!(run(&criteria).is_empty());
    }

    #[test]
    fn test_criteria_json_is_camel_case() {
        let json = r#"{"white":"","black":"","result":"","moves":true,"ignoreColor":false,
            "minWhiteRating":0,"minBlackRating":0,"maxWhiteRating":0,"maxBlackRating":0,
            "eco":"","targetMoves":["e4"]}"#;
        let criteria: FilterCriteria = serde_json::from_str(json).unwrap();
        assert!(criteria.moves);
        assert_eq!(criteria.target_moves, vec!["e4"]);
        assert!(criteria.time_control.is_empty());
    }
}
