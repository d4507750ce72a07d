//! Monthly Lichess broadcast archives: file names and the months on offer.

use chrono::{Datelike, Months, NaiveDate};

pub const ARCHIVE_BASE_URL: &str = "https://database.lichess.org/broadcast/";
/// Year of the first published archive.
pub const FIRST_ARCHIVE_YEAR: i32 = 2020;

pub fn broadcast_archive_name(year: i32, month: u32) -> String {
    format!("lichess_db_broadcast_{}-{:02}.pgn.zst", year, month)
}

pub fn broadcast_archive_url(year: i32, month: u32) -> String {
    format!("{}{}", ARCHIVE_BASE_URL, broadcast_archive_name(year, month))
}

/// The calendar month before `today`, as `(year, month)`. A month's archive
/// is published once it is over.
pub fn default_month(today: NaiveDate) -> (i32, u32) {
    let previous = today
        .with_day(1)
        .and_then(|first| first.checked_sub_months(Months::new(1)))
        .unwrap_or(today);
    (previous.year(), previous.month())
}

pub fn available_years(today: NaiveDate) -> Vec<i32> {
    (FIRST_ARCHIVE_YEAR..=default_month(today).0).collect()
}

/// Months of `year` with a published archive as of `today`.
pub fn available_months(year: i32, today: NaiveDate) -> Vec<u32> {
    let (last_year, last_month) = default_month(today);
    if year < FIRST_ARCHIVE_YEAR || year > last_year {
        Vec::new()
    } else if year < last_year {
        (1..=12).collect()
    } else {
        (1..=last_month).collect()
    }
}
