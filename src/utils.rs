use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})\s*(?:年|-|/|\.)\s*(\d{1,2})\s*(?:月|-|/|\.)\s*(\d{1,2})\s*日?")
        .expect("date pattern")
});

/// Dates printed without a year: `10月11日`, or a bare `10-11` that is not
/// part of a longer dashed run such as `01-02-03`.
static MONTH_DAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\s*月\s*(\d{1,2})\s*日|(^|[^\d\-/.:])(\d{2})-(\d{2})([^\d\-/.:]|$)")
        .expect("month-day pattern")
});

/// Parses a single date field as upstream sources spell it:
/// `2025-10-19`, `2025-10-19(日)`, `2025-10-19 21:15:00`, `2025/10/19`, `2025年10月19日`.
pub fn parse_draw_date(text: &str) -> Option<NaiveDate> {
    let caps = DATE_PATTERN.captures(text.trim())?;
    ymd_from_captures(&caps)
}

/// First date mentioned anywhere in free text.
pub fn find_draw_date(text: &str) -> Option<NaiveDate> {
    DATE_PATTERN
        .captures_iter(text)
        .find_map(|caps| ymd_from_captures(&caps))
}

fn ymd_from_captures(caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let day = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// First yearless date in free text, placed in the reference year unless
/// that lands after the reference date (a December draw read in January).
pub fn find_month_day(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    MONTH_DAY_PATTERN.captures_iter(text).find_map(|caps| {
        let (month, day) = match (caps.get(1), caps.get(2)) {
            (Some(m), Some(d)) => (m, d),
            _ => (caps.get(4)?, caps.get(5)?),
        };
        let month: u32 = month.as_str().parse().ok()?;
        let day: u32 = day.as_str().parse().ok()?;
        let year = reference.year();
        match NaiveDate::from_ymd_opt(year, month, day)? {
            date if date > reference => NaiveDate::from_ymd_opt(year - 1, month, day),
            date => Some(date),
        }
    })
}

/// Full date first, yearless date second.
pub fn find_draw_date_near(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    find_draw_date(text).or_else(|| find_month_day(text, reference))
}

/// Removes date mentions, with or without a year, so their day and month
/// digits are not read as balls.
pub fn strip_dates(text: &str) -> String {
    let full = DATE_PATTERN.replace_all(text, " ");
    MONTH_DAY_PATTERN
        .replace_all(&full, |caps: &regex::Captures<'_>| {
            let before = caps.get(3).map_or("", |m| m.as_str());
            let after = caps.get(6).map_or("", |m| m.as_str());
            format!("{} {}", before, after)
        })
        .into_owned()
}

/// Converts a yuan amount such as `875,465,046.55` into fen.
pub fn parse_amount_fen(text: &str) -> Option<i64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '，' | ' ' | '元'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (whole, frac) = match cleaned.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (cleaned.as_str(), ""),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let yuan: i64 = whole.parse().ok()?;
    let fen = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac[..2].parse::<i64>().ok()?,
    };
    yuan.checked_mul(100)?.checked_add(fen)
}

/// Character-safe truncation for log lines.
pub fn preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let head: String = collapsed.chars().take(max_chars).collect();
        format!("{}…", head)
    }
}
