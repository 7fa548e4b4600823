// Shared helpers for the HTML extractors.

use scraper::{ElementRef, Html, Selector};

use crate::normalize;
use crate::period::{self, PeriodContext};
use crate::types::GameRules;
use crate::utils::strip_dates;

/// Visible text with a space between text nodes so adjacent cells never fuse
/// into one digit run.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

pub fn page_text(document: &Html) -> String {
    element_text(document.root_element())
}

pub fn select_texts(document: &Html, selector: &Selector) -> Vec<String> {
    document.select(selector).map(element_text).collect()
}

/// Index of the first token that reads as a period on its own.
pub fn period_anchor<S: AsRef<str>>(tokens: &[S], ctx: &PeriodContext) -> Option<usize> {
    tokens
        .iter()
        .position(|t| period::resolve(&[t.as_ref()], ctx).is_ok())
}

/// Free-text heuristic: after dropping date mentions, the winning numbers
/// are the ball tokens that directly follow the period.
pub fn balls_after_period(
    text: &str,
    ctx: &PeriodContext,
    rules: &GameRules,
) -> Option<(Vec<u8>, Vec<u8>)> {
    let tokens = normalize::tokenize(&strip_dates(text));
    let anchor = period_anchor(&tokens, ctx)?;
    normalize::balls_from(&tokens, anchor + 1, rules, &[]).ok()
}

/// Ball-number cells in document order, restricted to the rule's range.
pub fn ball_cells(document: &Html, selector: &Selector, min: u8, max: u8) -> Vec<u8> {
    document
        .select(selector)
        .filter_map(|cell| element_text(cell).trim().parse::<u8>().ok())
        .filter(|v| (min..=max).contains(v))
        .collect()
}

/// Elements whose own text nodes mention `needle`, in document order, so an
/// enclosing element comes before anything nested in it.
pub fn elements_mentioning<'a>(document: &'a Html, needle: &str) -> Vec<ElementRef<'a>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| {
            el.children()
                .filter_map(|child| child.value().as_text())
                .any(|text| text.contains(needle))
        })
        .collect()
}
