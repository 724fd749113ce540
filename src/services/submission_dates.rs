use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

use crate::core::time::parse_rfc3339;

const PREFIXES: &[&str] = &["submitted on", "submitted:", "date:"];

const DATE_FORMATS: &[&[FormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]"),
    format_description!("[day]/[month]/[year]"),
    format_description!("[day].[month].[year]"),
    format_description!("[year]/[month]/[day]"),
];

fn iso_token() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").expect("valid iso date regex")
    })
}

fn day_first_token() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").expect("valid day-first date regex")
    })
}

fn strip_known_prefix(raw: &str) -> &str {
    let trimmed = raw.trim();
    for prefix in PREFIXES {
        let matches = trimmed
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if matches {
            return trimmed[prefix.len()..].trim_start_matches(':').trim();
        }
    }
    trimmed
}

fn calendar_date(year: &str, month: &str, day: &str) -> Option<Date> {
    let year: i32 = year.parse().ok()?;
    let month: u8 = month.parse().ok()?;
    let day: u8 = day.parse().ok()?;
    Date::from_calendar_date(year, time::Month::try_from(month).ok()?, day).ok()
}

fn embedded_date(text: &str) -> Option<Date> {
    if let Some(caps) = iso_token().captures(text) {
        if let Some(date) = calendar_date(&caps[1], &caps[2], &caps[3]) {
            return Some(date);
        }
    }
    day_first_token()
        .captures(text)
        .and_then(|caps| calendar_date(&caps[3], &caps[2], &caps[1]))
}

/// Parse a free-form "submitted on" value into a calendar date.
///
/// Accepts bare dates in the common layouts, `Submitted:`/`Date:` prefixes,
/// RFC 3339 timestamps (UTC date) and dates embedded in longer text.
pub(crate) fn normalize_submission_date(raw: &str) -> Option<Date> {
    let cleaned = strip_known_prefix(raw);
    if cleaned.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = Date::parse(cleaned, format) {
            return Some(date);
        }
    }

    if let Some(timestamp) = parse_rfc3339(cleaned) {
        return Some(timestamp.to_offset(time::UtcOffset::UTC).date());
    }

    embedded_date(cleaned)
}

pub(crate) fn normalize_submission_dates<S: AsRef<str>>(rows: &[S]) -> Vec<Option<Date>> {
    rows.iter().map(|raw| normalize_submission_date(raw.as_ref())).collect()
}

/// Consecutive calendar days ending at the newest submission date.
pub(crate) fn submission_streak(dates: &[Option<Date>]) -> u32 {
    let unique: BTreeSet<Date> = dates.iter().flatten().copied().collect();
    let mut newest_first = unique.into_iter().rev();

    let Some(mut current) = newest_first.next() else {
        return 0;
    };

    let mut streak = 1;
    for date in newest_first {
        if current.previous_day() != Some(date) {
            break;
        }
        streak += 1;
        current = date;
    }
    streak
}
