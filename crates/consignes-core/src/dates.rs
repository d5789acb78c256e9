//! Day selection helpers backing the `--date` option of the forms.

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{Error, Result};

/// Wire and display format of a day.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a day relative to `today`.
///
/// Accepts `YYYY-MM-DD`, `today`, `yesterday`, `tomorrow` and their French
/// counterparts, and signed offsets such as `-3` (three days ago).
pub fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let input = input.trim();
    match input.to_lowercase().as_str() {
        "" | "today" | "aujourdhui" | "aujourd'hui" => return Ok(today),
        "yesterday" | "hier" => return previous_day(today),
        "tomorrow" | "demain" => return next_day(today),
        _ => {}
    }

    if let Some(digits) = input.strip_prefix(['+', '-']) {
        return offset_from(today, input.starts_with('-'), digits)
            .ok_or_else(|| Error::validation_field("date", format!("'{input}' is not a day offset")));
    }

    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|e| {
        Error::validation_field("date", format!("'{input}' is not a date ({e})"))
    })
}

/// `today` moved by an unsigned run of digits, backwards when `back`.
fn offset_from(today: NaiveDate, back: bool, digits: &str) -> Option<NaiveDate> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let days = digits.parse::<i64>().ok()?;
    let delta = Duration::try_days(if back { -days } else { days })?;
    today.checked_add_signed(delta)
}

/// The day before `date`.
pub fn previous_day(date: NaiveDate) -> Result<NaiveDate> {
    date.pred_opt()
        .ok_or_else(|| Error::validation_field("date", "no day before this one"))
}

/// The day after `date`.
pub fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.succ_opt()
        .ok_or_else(|| Error::validation_field("date", "no day after this one"))
}

/// The Monday-first week containing `date`.
pub fn week_of(date: NaiveDate) -> Vec<NaiveDate> {
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    monday.iter_days().take(7).collect()
}

/// Formats a day the way the backend expects it.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
