use super::{Mode, ParsedTimeControl, Period, TimeControlError, parse_u32};

fn special(input: &str, mode: Mode, periods: Vec<Period>, normalized: String) -> ParsedTimeControl {
    ParsedTimeControl {
        raw: input.to_string(),
        normalized: Some(normalized),
        periods,
        mode,
        inferred: false,
    }
}

/// PGN standard forms: `?`, `-`, `*N`, `N`, `N+I`, `M/N`, and `:`-joined stages.
/// `None` means the input is not in standard form.
pub(super) fn try_strict_parse(input: &str) -> Option<Result<ParsedTimeControl, TimeControlError>> {
    if input == "?" {
        return Some(Ok(special(input, Mode::Unknown, Vec::new(), "?".to_string())));
    }

    if input == "-" {
        return Some(Ok(special(input, Mode::Unlimited, Vec::new(), "-".to_string())));
    }

    if let Some(secs_str) = input.strip_prefix('*') {
        let secs = parse_u32(secs_str).ok_or_else(|| TimeControlError::Sandclock(input.to_string()));
        return Some(secs.map(|secs| {
            let period = Period {
                moves: None,
                base_seconds: secs,
                increment_seconds: None,
            };
            special(input, Mode::Sandclock, vec![period], format!("*{}", secs))
        }));
    }

    if input.contains(':') {
        let periods = input.split(':').map(parse_stage).collect::<Option<Vec<_>>>()?;
        return Some(Ok(normal(input, periods, false)));
    }

    let period = parse_stage(input)?;
    if looks_like_minute_shorthand(&period) {
        return None;
    }
    Some(Ok(normal(input, vec![period], false)))
}

pub(super) fn normal(input: &str, periods: Vec<Period>, inferred: bool) -> ParsedTimeControl {
    let normalized = periods
        .iter()
        .map(format_period)
        .collect::<Vec<_>>()
        .join(":");

    ParsedTimeControl {
        raw: input.to_string(),
        normalized: Some(normalized),
        periods,
        mode: Mode::Normal,
        inferred,
    }
}

/// `3+2` and `15+10` are minutes in practice; no real control starts below
/// one minute with an increment that large.
pub(super) fn looks_like_minute_shorthand(period: &Period) -> bool {
    if period.moves.is_some() {
        return false;
    }

    if let Some(inc) = period.increment_seconds {
        (period.base_seconds < 60 && inc <= 60)
            || ((period.base_seconds == 75 || period.base_seconds == 90) && inc == 30)
    } else {
        period.base_seconds < 60
    }
}

pub(super) fn parse_stage(s: &str) -> Option<Period> {
    let (base_part, inc_part) = match s.split_once('+') {
        Some((base, inc)) if !inc.contains('+') => (base, Some(inc)),
        Some(_) => return None,
        None => (s, None),
    };

    let (moves, base_str) = match base_part.split_once('/') {
        Some((moves, base)) if !base.contains('/') => (Some(parse_u32(moves)?), base),
        Some(_) => return None,
        None => (None, base_part),
    };

    let base_seconds = parse_u32(base_str)?;
    let increment_seconds = match inc_part {
        Some(inc_str) => Some(parse_u32(inc_str)?),
        None => None,
    };

    Some(Period {
        moves,
        base_seconds,
        increment_seconds,
    })
}

pub(super) fn format_period(p: &Period) -> String {
    let base = match p.moves {
        Some(m) => format!("{}/{}", m, p.base_seconds),
        None => p.base_seconds.to_string(),
    };

    match p.increment_seconds {
        Some(inc) => format!("{}+{}", base, inc),
        None => base,
    }
}
