mod strict;

#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub moves: Option<u32>,
    pub base_seconds: u32,
    pub increment_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Unknown,
    Unlimited,
    Sandclock,
    Normal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTimeControl {
    pub raw: String,
    pub normalized: Option<String>,
    pub periods: Vec<Period>,
    pub mode: Mode,
    /// Set when the value was read as minute shorthand (`3+2`).
    pub inferred: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimeControlError {
    #[error("empty time control")]
    Empty,
    #[error("invalid sandclock time control '{0}'")]
    Sandclock(String),
}

/// Speed buckets by estimated game duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    UltraBullet,
    Bullet,
    Blitz,
    Rapid,
    Classical,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UltraBullet => "ultra-bullet",
            Self::Bullet => "bullet",
            Self::Blitz => "blitz",
            Self::Rapid => "rapid",
            Self::Classical => "classical",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_u32(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}

fn unknown(raw: &str) -> ParsedTimeControl {
    ParsedTimeControl {
        raw: raw.to_string(),
        normalized: None,
        periods: Vec::new(),
        mode: Mode::Unknown,
        inferred: false,
    }
}

fn infer_minutes(input: &str) -> Option<ParsedTimeControl> {
    let period = strict::parse_stage(input)?;
    if !strict::looks_like_minute_shorthand(&period) {
        return None;
    }
    let base_seconds = period.base_seconds.checked_mul(60)?;
    Some(strict::normal(
        input,
        vec![Period {
            base_seconds,
            ..period
        }],
        true,
    ))
}

/// Parses a `TimeControl` tag value. Unrecognised text is not an error: it
/// yields `Mode::Unknown` without a normalized form.
pub fn parse_timecontrol(raw: &str) -> Result<ParsedTimeControl, TimeControlError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(TimeControlError::Empty);
    }

    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();

    let parsed = match strict::try_strict_parse(&compact) {
        Some(result) => result?,
        None => infer_minutes(&compact).unwrap_or_else(|| unknown(raw)),
    };

    Ok(ParsedTimeControl {
        raw: raw.to_string(),
        ..parsed
    })
}

/// First period read literally in seconds, the way exporters write clocks.
/// Unlike `parse_timecontrol`, `15+0` stays fifteen seconds.
pub fn first_period_seconds(raw: &str) -> Option<Period> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    compact.split(':').next().and_then(strict::parse_stage)
}

pub fn normalize_timecontrol(raw: &str) -> Option<String> {
    parse_timecontrol(raw).ok()?.normalized
}

impl ParsedTimeControl {
    /// Base and increment of the first period, in seconds.
    pub fn initial(&self) -> Option<(u32, u32)> {
        let period = self.periods.first()?;
        Some((period.base_seconds, period.increment_seconds.unwrap_or(0)))
    }

    pub fn category(&self) -> Option<Category> {
        if self.mode != Mode::Normal {
            return None;
        }

        let (base, increment) = self.initial()?;
        let estimated_seconds = base as u64 + 40 * increment as u64;

        Some(match estimated_seconds {
            0..=29 => Category::UltraBullet,
            30..=179 => Category::Bullet,
            180..=479 => Category::Blitz,
            480..=1499 => Category::Rapid,
            _ => Category::Classical,
        })
    }
}

pub fn categorize_timecontrol(raw: &str) -> Option<Category> {
    parse_timecontrol(raw).ok()?.category()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_preserves_original_input() {
        let result = parse_timecontrol(" 15 + 10 ").unwrap();
        assert_eq!(result.raw, " 15 + 10 ");
        assert_eq!(result.normalized, Some("900+10".to_string()));
        assert!(result.inferred);
    }

    #[test]
    fn test_normalize_function() {
        assert_eq!(normalize_timecontrol("3+2"), Some("180+2".to_string()));
        assert_eq!(normalize_timecontrol("180+2"), Some("180+2".to_string()));
        assert_eq!(normalize_timecontrol("?"), Some("?".to_string()));
        assert_eq!(normalize_timecontrol("invalid"), None);
        assert_eq!(normalize_timecontrol(""), None);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert_eq!(parse_timecontrol("  "), Err(TimeControlError::Empty));
    }

    #[test]
    fn test_initial_period() {
        assert_eq!(parse_timecontrol("180+0").unwrap().initial(), Some((180, 0)));
        assert_eq!(parse_timecontrol("5400").unwrap().initial(), Some((5400, 0)));
        assert_eq!(parse_timecontrol("?").unwrap().initial(), None);
    }

    #[test]
    fn test_first_period_seconds_is_literal() {
        let period = first_period_seconds("15+0").unwrap();
        assert_eq!(period.base_seconds, 15);
        assert_eq!(first_period_seconds("40/5400+30:1800+30").unwrap().base_seconds, 5400);
        assert_eq!(first_period_seconds("-"), None);
    }

    #[test]
    fn test_category_threshold_boundaries() {
        assert_eq!(categorize_timecontrol("15+0"), Some(Category::Rapid));
        assert_eq!(categorize_timecontrol("45+0"), Some(Category::Classical));
        assert_eq!(categorize_timecontrol("60+0"), Some(Category::Bullet));
        assert_eq!(categorize_timecontrol("179+0"), Some(Category::Bullet));
        assert_eq!(categorize_timecontrol("180+0"), Some(Category::Blitz));
        assert_eq!(categorize_timecontrol("479+0"), Some(Category::Blitz));
        assert_eq!(categorize_timecontrol("480+0"), Some(Category::Rapid));
        assert_eq!(categorize_timecontrol("1499+0"), Some(Category::Rapid));
        assert_eq!(categorize_timecontrol("1500+0"), Some(Category::Classical));
    }

    #[test]
    fn test_category_increment_driven_case() {
        assert_eq!(categorize_timecontrol("2+12"), Some(Category::Rapid));
        assert_eq!(Category::Rapid.to_string(), "rapid");
    }

    #[test]
    fn test_category_returns_none_for_non_normal_modes_and_invalid() {
        assert_eq!(categorize_timecontrol("?"), None);
        assert_eq!(categorize_timecontrol("-"), None);
        assert_eq!(categorize_timecontrol("*60"), None);
        assert_eq!(categorize_timecontrol("klassisch"), None);
    }

    #[test]
    fn test_category_returns_none_when_normal_mode_has_no_periods() {
        let parsed = ParsedTimeControl {
            raw: "n/a".to_string(),
            normalized: Some("n/a".to_string()),
            periods: Vec::new(),
            mode: Mode::Normal,
            inferred: false,
        };

        assert_eq!(parsed.category(), None);
    }
}
