use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

static US_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid us date regex"));

static LENIENT_US_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{2,4})$").expect("valid lenient us date regex")
});

/// Parses `MM/DD/YYYY` (single-digit month/day accepted). Returns `None` for
/// anything that does not match or is not a real calendar date.
pub fn parse_us_date(text: &str) -> Option<NaiveDate> {
    let caps = US_DATE_RE.captures(text.trim())?;
    let month = caps[1].parse::<u32>().ok()?;
    let day = caps[2].parse::<u32>().ok()?;
    let year = caps[3].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Historical exports mix separators and two-digit years; `70..=99` are read
/// as 19xx, everything else below 100 as 20xx.
pub fn parse_us_date_lenient(text: &str) -> Option<NaiveDate> {
    let caps = LENIENT_US_DATE_RE.captures(text.trim())?;
    let month = caps[1].parse::<u32>().ok()?;
    let day = caps[2].parse::<u32>().ok()?;
    let raw_year = &caps[3];
    let mut year = raw_year.parse::<i32>().ok()?;
    if raw_year.len() == 2 {
        year += if year >= 70 { 1900 } else { 2000 };
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn format_us_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// `MM/DD/YYYY` to the `YYYY-MM-DD` form used by date inputs; blank when unparseable.
pub fn us_to_ymd(text: &str) -> String {
    parse_us_date(text)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn ymd_to_us(text: &str) -> Option<String> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .ok()
        .map(format_us_date)
}

pub fn parse_rfc3339(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|value| value.with_timezone(&Utc))
}

pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn shift_to_monday_if_weekend(date: NaiveDate) -> NaiveDate {
    let offset = match date.weekday() {
        Weekday::Sat => 2,
        Weekday::Sun => 1,
        _ => 0,
    };
    add_days(date, offset).unwrap_or(date)
}

pub fn shift_to_friday_if_weekend(date: NaiveDate) -> NaiveDate {
    let offset = match date.weekday() {
        Weekday::Sat => -1,
        Weekday::Sun => -2,
        _ => 0,
    };
    add_days(date, offset).unwrap_or(date)
}

pub fn next_business_day(date: NaiveDate) -> NaiveDate {
    add_days(date, 1)
        .map(shift_to_monday_if_weekend)
        .unwrap_or(date)
}

/// Inclusive count of Monday-Friday days. Holidays are not considered.
pub fn business_day_count(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<i64> {
    let (start, end) = (start?, end?);
    if end < start {
        return None;
    }

    let total_days = (end - start).num_days() + 1;
    let full_weeks = total_days / 7;
    let mut count = full_weeks * 5;

    let mut cursor = add_days(start, full_weeks * 7)?;
    while cursor <= end {
        if !is_weekend(cursor) {
            count += 1;
        }
        cursor = add_days(cursor, 1)?;
    }
    Some(count)
}

pub fn quarter_label(date: NaiveDate) -> String {
    let quarter = (date.month() - 1) / 3 + 1;
    format!("{} Q{}", date.year(), quarter)
}
