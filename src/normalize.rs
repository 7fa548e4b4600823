//! Turns raw numeric tokens into ball sets and checks drafts against the
//! game's arity and range rules.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::error::{CrawlError, Result};
use crate::types::{BallRule, DrawResult, GameRules};

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("digit pattern"));

/// Digit runs in document order. Any non-digit (`,`, `+`, whitespace, markup
/// leftovers) separates tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    DIGIT_RUN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A token can only be a ball if it has one or two digits, is non-zero, fits
/// under the game's largest ball and is not excluded by the source.
pub fn ball_value(token: &str, rules: &GameRules, exclusions: &[u32]) -> Option<u8> {
    if token.is_empty() || token.len() > 2 {
        return None;
    }
    let value: u32 = token.parse().ok()?;
    if value == 0 || value > u32::from(rules.largest_ball()) || exclusions.contains(&value) {
        return None;
    }
    u8::try_from(value).ok()
}

/// Splits tokens into primary and secondary balls: the first N surviving
/// tokens are primary, the next M secondary. Anything other than exactly
/// N + M survivors is an error, and so is a category that falls outside its
/// own range, so a heuristic that picked the wrong tokens gives way to the
/// next one.
pub fn split_balls<S: AsRef<str>>(
    tokens: &[S],
    rules: &GameRules,
    exclusions: &[u32],
) -> Result<(Vec<u8>, Vec<u8>)> {
    let values: Vec<u8> = tokens
        .iter()
        .filter_map(|t| ball_value(t.as_ref(), rules, exclusions))
        .collect();
    assign(values, rules)
}

/// Reads the first N + M ball tokens from `start` on. Used by free-text
/// heuristics where the page continues after the winning numbers.
pub fn balls_from<S: AsRef<str>>(
    tokens: &[S],
    start: usize,
    rules: &GameRules,
    exclusions: &[u32],
) -> Result<(Vec<u8>, Vec<u8>)> {
    let wanted = rules.ball_count();
    let values: Vec<u8> = tokens
        .iter()
        .skip(start)
        .filter_map(|t| ball_value(t.as_ref(), rules, exclusions))
        .take(wanted)
        .collect();
    assign(values, rules)
}

/// For payloads that already separate the two ball categories.
pub fn split_sections<S: AsRef<str>>(
    primary_tokens: &[S],
    secondary_tokens: &[S],
    rules: &GameRules,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let primary: Vec<u8> = primary_tokens
        .iter()
        .filter_map(|t| ball_value(t.as_ref(), rules, &[]))
        .collect();
    let secondary: Vec<u8> = secondary_tokens
        .iter()
        .filter_map(|t| ball_value(t.as_ref(), rules, &[]))
        .collect();
    if primary.len() != rules.primary.count || secondary.len() != rules.secondary.count {
        return Err(CrawlError::NormalizationFailed {
            expected: rules.ball_count(),
            found: primary.len() + secondary.len(),
        });
    }

    let mut values = primary;
    values.extend(secondary);
    assign(values, rules)
}

fn assign(mut values: Vec<u8>, rules: &GameRules) -> Result<(Vec<u8>, Vec<u8>)> {
    let expected = rules.ball_count();
    if values.len() != expected {
        return Err(CrawlError::NormalizationFailed {
            expected,
            found: values.len(),
        });
    }

    let mut secondary = values.split_off(rules.primary.count);
    let mut primary = values;
    primary.sort_unstable();
    secondary.sort_unstable();
    check_set("primary", &primary, &rules.primary)?;
    check_set("secondary", &secondary, &rules.secondary)?;
    Ok((primary, secondary))
}

/// Arity, range, distinctness and period shape. Nothing that fails this is
/// ever persisted.
pub fn validate(draw: &DrawResult) -> Result<()> {
    let rules = draw.game.rules();

    if draw.period.len() != rules.period_len || !draw.period.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CrawlError::ArityOrRangeInvalid(format!(
            "period '{}' is not a {}-digit number",
            draw.period, rules.period_len
        )));
    }

    check_set("primary", &draw.primary_balls, &rules.primary)?;
    check_set("secondary", &draw.secondary_balls, &rules.secondary)?;
    Ok(())
}

fn check_set(label: &str, balls: &[u8], rule: &BallRule) -> Result<()> {
    if balls.len() != rule.count {
        return Err(CrawlError::ArityOrRangeInvalid(format!(
            "{} balls: expected {}, got {}",
            label,
            rule.count,
            balls.len()
        )));
    }

    if let Some(bad) = balls.iter().find(|b| !rule.contains(**b)) {
        return Err(CrawlError::ArityOrRangeInvalid(format!(
            "{} ball {} outside {}..={}",
            label, bad, rule.min, rule.max
        )));
    }

    let distinct: HashSet<u8> = balls.iter().copied().collect();
    if distinct.len() != balls.len() {
        return Err(CrawlError::ArityOrRangeInvalid(format!(
            "{} balls contain duplicates: {:?}",
            label, balls
        )));
    }
    Ok(())
}
