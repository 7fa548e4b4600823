//! Period number resolution.
//!
//! Sources spell the same draw as `2025119`, `25119` or bury it in a longer
//! digit run. Resolution is an ordered list of pure rules; the first rule
//! that yields a period wins, and inside a rule the first token in document
//! order wins.

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::error::{CrawlError, Result};
use crate::types::GameRules;

/// Highest sequence number a period can carry inside one year.
const MAX_SEQUENCE: u32 = 365;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodContext {
    /// Expected draw years, most likely first.
    years: Vec<i32>,
    full_len: usize,
    short_len: usize,
}

impl PeriodContext {
    pub fn new(rules: &GameRules, years: Vec<i32>) -> Self {
        Self {
            years,
            full_len: rules.period_len,
            short_len: rules.short_period_len,
        }
    }

    /// Reference year plus the one before it, so draws published around
    /// New Year still resolve.
    pub fn around(rules: &GameRules, reference: NaiveDate) -> Self {
        let year = reference.year();
        Self::new(rules, vec![year, year - 1])
    }

    /// Puts `year` first when a source exposes the draw date.
    pub fn prefer(mut self, year: i32) -> Self {
        self.years.retain(|y| *y != year);
        self.years.insert(0, year);
        self
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    fn full_form(&self, token: &str) -> Option<String> {
        if token.len() != self.full_len || !is_digits(token) {
            return None;
        }
        let prefix_len = self.full_len.checked_sub(3)?;
        let year_ok = self
            .years
            .iter()
            .any(|y| token[..prefix_len] == format!("{:0width$}", y, width = prefix_len));
        (year_ok && plausible_sequence(&token[prefix_len..])).then(|| token.to_string())
    }

    fn short_form(&self, token: &str) -> Option<String> {
        if token.len() != self.short_len || !is_digits(token) {
            return None;
        }
        let suffix_len = self.short_len.checked_sub(3)?;
        let century_len = self.full_len.checked_sub(self.short_len)?;
        let year = self.years.iter().find(|y| {
            let full = format!("{:04}", y);
            full.len() >= suffix_len && token[..suffix_len] == full[full.len() - suffix_len..]
        })?;
        if !plausible_sequence(&token[suffix_len..]) {
            return None;
        }
        let century = &format!("{:04}", year)[..century_len];
        Some(format!("{}{}", century, token))
    }
}

pub type PeriodRule = fn(&[&str], &PeriodContext) -> Option<String>;

pub const RULES: [(&str, PeriodRule); 3] = [
    ("full_length", full_length),
    ("short_expanded", short_expanded),
    ("embedded", embedded),
];

pub fn resolve(tokens: &[&str], ctx: &PeriodContext) -> Result<String> {
    for (name, rule) in RULES {
        if let Some(period) = rule(tokens, ctx) {
            debug!(rule = name, %period, "period resolved");
            return Ok(period);
        }
    }
    Err(CrawlError::PeriodUnresolved)
}

/// Convenience for callers holding owned tokens.
pub fn resolve_owned(tokens: &[String], ctx: &PeriodContext) -> Result<String> {
    let borrowed: Vec<&str> = tokens.iter().map(String::as_str).collect();
    resolve(&borrowed, ctx)
}

pub fn full_length(tokens: &[&str], ctx: &PeriodContext) -> Option<String> {
    tokens.iter().find_map(|t| ctx.full_form(t))
}

pub fn short_expanded(tokens: &[&str], ctx: &PeriodContext) -> Option<String> {
    tokens.iter().find_map(|t| ctx.short_form(t))
}

pub fn embedded(tokens: &[&str], ctx: &PeriodContext) -> Option<String> {
    let runs: Vec<&str> = tokens
        .iter()
        .copied()
        .filter(|t| t.len() > ctx.short_len && is_digits(t))
        .collect();

    let full = runs.iter().filter(|r| r.len() > ctx.full_len).find_map(|run| {
        windows(run, ctx.full_len).find_map(|w| ctx.full_form(w))
    });
    if full.is_some() {
        return full;
    }

    runs.iter()
        .find_map(|run| windows(run, ctx.short_len).find_map(|w| ctx.short_form(w)))
}

fn windows(run: &str, len: usize) -> impl Iterator<Item = &str> {
    (0..=run.len().saturating_sub(len))
        .filter(move |_| run.len() >= len)
        .map(move |start| &run[start..start + len])
}

fn plausible_sequence(digits: &str) -> bool {
    digits
        .parse::<u32>()
        .map(|n| (1..=MAX_SEQUENCE).contains(&n))
        .unwrap_or(false)
}

fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameCode;

    fn ctx(year: i32) -> PeriodContext {
        PeriodContext::new(GameCode::Ssq.rules(), vec![year])
    }

    #[test]
    fn accepts_full_length_token() {
        let tokens = ["19", "2025119", "04"];
        assert_eq!(full_length(&tokens, &ctx(2025)), Some("2025119".to_string()));
    }

    #[test]
    fn rejects_full_length_with_wrong_year_or_sequence() {
        assert_eq!(full_length(&["2024119"], &ctx(2025)), None);
        assert_eq!(full_length(&["2025000"], &ctx(2025)), None);
        assert_eq!(full_length(&["2025366"], &ctx(2025)), None);
    }

    #[test]
    fn expands_short_token_with_century() {
        assert_eq!(short_expanded(&["25118"], &ctx(2025)), Some("2025118".to_string()));
        assert_eq!(short_expanded(&["24118"], &ctx(2025)), None);
    }

    #[test]
    fn finds_period_embedded_in_longer_run() {
        let tokens = ["88882025119"];
        assert_eq!(embedded(&tokens, &ctx(2025)), Some("2025119".to_string()));
        assert_eq!(embedded(&["9925118"], &ctx(2025)), Some("2025118".to_string()));
    }

    #[test]
    fn full_length_rule_beats_short_rule_regardless_of_position() {
        let tokens = ["25117", "2025118"];
        assert_eq!(resolve(&tokens, &ctx(2025)).unwrap(), "2025118");
    }

    #[test]
    fn first_candidate_in_document_order_wins() {
        let tokens = ["2025120", "2025119"];
        assert_eq!(resolve(&tokens, &ctx(2025)).unwrap(), "2025120");
    }

    #[test]
    fn resolves_short_period_from_mixed_tokens() {
        let tokens = ["25118", "06", "09", "23", "26", "28", "32", "11"];
        assert_eq!(resolve(&tokens, &ctx(2025)).unwrap(), "2025118");
    }

    #[test]
    fn unresolved_when_nothing_plausible() {
        let err = resolve(&["06", "2019", "123456"], &ctx(2025)).unwrap_err();
        assert!(matches!(err, CrawlError::PeriodUnresolved));
    }

    #[test]
    fn previous_year_is_accepted_around_new_year() {
        let reference = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let ctx = PeriodContext::around(GameCode::Dlt.rules(), reference);
        assert_eq!(resolve(&["25150"], &ctx).unwrap(), "2025150");
        assert_eq!(resolve(&["26001"], &ctx).unwrap(), "2026001");
    }

    #[test]
    fn preferred_year_moves_to_front() {
        let ctx = ctx(2026).prefer(2024);
        assert_eq!(ctx.years(), &[2024, 2026]);
    }
}
