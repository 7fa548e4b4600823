//! kaijiang.500.com draw pages (`ssq.shtml`, `dlt.shtml`).
//!
//! The page is tabular HTML, but its class names drift between redesigns,
//! so balls and period are each located by an ordered list of heuristics.

use chrono::Datelike;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use super::html::{ball_cells, balls_after_period, page_text, select_texts};
use super::{Attempt, Draft, ExtractContext, Extractor, ensure_supported, first_match};
use crate::error::{CrawlError, Result};
use crate::normalize;
use crate::period::{self, PeriodContext};
use crate::types::{DrawResult, GameCode, GameRules};
use crate::utils::{find_draw_date_near, parse_amount_fen, strip_dates};

static BALL_REGION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".ball_box01, .ball_box, .kjhm, .kjhm_box").expect("ball region selector")
});
static RED_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".ball_red").expect("red cell selector"));
static BLUE_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".ball_blue").expect("blue cell selector"));
static LEGACY_RED_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".red").expect("legacy red selector"));
static LEGACY_BLUE_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".blue").expect("legacy blue selector"));
static PERIOD_LABEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".cfont2, .kjqihao, .qihao, .period").expect("period label selector")
});

static PERIOD_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{5,7})\s*期").expect("period suffix pattern"));
static SALES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"本期销量[：:]\s*([0-9,.]+)").expect("sales pattern"));
static POOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"奖池滚存[：:]\s*([0-9,.]+)").expect("pool pattern"));

pub struct KaijiangExtractor;

struct Page<'a> {
    document: &'a Html,
    text: String,
    rules: &'static GameRules,
    periods: PeriodContext,
}

impl Extractor for KaijiangExtractor {
    fn name(&self) -> &str {
        "kaijiang.500.com"
    }

    fn supports(&self, game: GameCode) -> bool {
        matches!(game, GameCode::Ssq | GameCode::Dlt)
    }

    fn extract(&self, doc: &str, ctx: &ExtractContext) -> Result<DrawResult> {
        ensure_supported(self, ctx.game)?;

        let document = Html::parse_document(doc);
        let text = page_text(&document);
        if text.trim().is_empty() {
            return Err(CrawlError::extraction(self.name(), "empty page"));
        }

        let draw_date = find_draw_date_near(&text, ctx.reference_date);
        let mut periods = ctx.period_context();
        if let Some(date) = draw_date {
            periods = periods.prefer(date.year());
        }
        let page = Page {
            document: &document,
            text,
            rules: ctx.rules(),
            periods,
        };

        let period_attempts: [(&str, Attempt<Page<'_>, String>); 3] = [
            ("labelled_period", labelled_period),
            ("period_suffix", period_suffix),
            ("page_tokens", page_period),
        ];
        let ball_attempts: [(&str, Attempt<Page<'_>, (Vec<u8>, Vec<u8>)>); 4] = [
            ("ball_region", ball_region),
            ("ball_cells", class_cells),
            ("legacy_cells", legacy_cells),
            ("after_period", after_period),
        ];

        let draft = Draft {
            period: first_match(self.name(), "period", &page, &period_attempts),
            draw_date,
            balls: first_match(self.name(), "balls", &page, &ball_attempts),
            sales: capture_amount(&SALES, &page.text),
            pool_amount: capture_amount(&POOL, &page.text),
            prizes: Vec::new(),
        };
        draft.finish(self.name(), ctx)
    }
}

fn labelled_period(page: &Page<'_>) -> Option<String> {
    let tokens: Vec<String> = select_texts(page.document, &PERIOD_LABEL)
        .iter()
        .flat_map(|t| normalize::tokenize(t))
        .collect();
    period::resolve_owned(&tokens, &page.periods).ok()
}

fn period_suffix(page: &Page<'_>) -> Option<String> {
    let tokens: Vec<&str> = PERIOD_SUFFIX
        .captures_iter(&page.text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    period::resolve(&tokens, &page.periods).ok()
}

fn page_period(page: &Page<'_>) -> Option<String> {
    let tokens = normalize::tokenize(&strip_dates(&page.text));
    period::resolve_owned(&tokens, &page.periods).ok()
}

fn ball_region(page: &Page<'_>) -> Option<(Vec<u8>, Vec<u8>)> {
    select_texts(page.document, &BALL_REGION)
        .iter()
        .find_map(|text| {
            let tokens = normalize::tokenize(&strip_dates(text));
            normalize::split_balls(&tokens, page.rules, &[]).ok()
        })
}

fn class_cells(page: &Page<'_>) -> Option<(Vec<u8>, Vec<u8>)> {
    cells(page, &RED_CELL, &BLUE_CELL)
}

fn legacy_cells(page: &Page<'_>) -> Option<(Vec<u8>, Vec<u8>)> {
    cells(page, &LEGACY_RED_CELL, &LEGACY_BLUE_CELL)
}

/// The featured draw is the first group of colored cells on the page.
fn cells(page: &Page<'_>, red: &Selector, blue: &Selector) -> Option<(Vec<u8>, Vec<u8>)> {
    let (primary_rule, secondary_rule) = (page.rules.primary, page.rules.secondary);
    let reds = ball_cells(page.document, red, primary_rule.min, primary_rule.max);
    let blues = ball_cells(page.document, blue, secondary_rule.min, secondary_rule.max);
    if reds.len() < primary_rule.count || blues.len() < secondary_rule.count {
        return None;
    }

    let mut primary = reds[..primary_rule.count].to_vec();
    let mut secondary = blues[..secondary_rule.count].to_vec();
    primary.sort_unstable();
    secondary.sort_unstable();
    Some((primary, secondary))
}

fn after_period(page: &Page<'_>) -> Option<(Vec<u8>, Vec<u8>)> {
    balls_after_period(&page.text, &page.periods, page.rules)
}

fn capture_amount(pattern: &Regex, text: &str) -> Option<i64> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_amount_fen(m.as_str()))
}
