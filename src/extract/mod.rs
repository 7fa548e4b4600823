//! One extractor per upstream format family. Extractors are pure: they get
//! an already fetched body and return a draft, never touching the network.

pub mod cwl;
mod html;
pub mod kaijiang;
pub mod sporttery;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{CrawlError, Result};
use crate::period::PeriodContext;
use crate::types::{DrawResult, GameCode, GameRules, PrizeTier};

pub use cwl::{CwlHomeExtractor, CwlNoticeExtractor};
pub use kaijiang::KaijiangExtractor;
pub use sporttery::SportteryExtractor;

#[derive(Debug, Clone, Copy)]
pub struct ExtractContext {
    pub game: GameCode,
    /// "Today" for the acquisition; anchors expected period years and the
    /// fallback draw date.
    pub reference_date: NaiveDate,
}

impl ExtractContext {
    pub fn new(game: GameCode, reference_date: NaiveDate) -> Self {
        Self { game, reference_date }
    }

    pub fn rules(&self) -> &'static GameRules {
        self.game.rules()
    }

    pub fn period_context(&self) -> PeriodContext {
        PeriodContext::around(self.rules(), self.reference_date)
    }
}

pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, game: GameCode) -> bool;

    fn extract(&self, doc: &str, ctx: &ExtractContext) -> Result<DrawResult>;
}

/// Sources with paged historical listings.
pub trait HistoryExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// The outer error means the page itself is unreadable; inner errors are
    /// per-item and get skipped by the caller.
    fn extract_page(&self, doc: &str, ctx: &ExtractContext) -> Result<Vec<Result<DrawResult>>>;
}

pub type Attempt<I, O> = fn(&I) -> Option<O>;

/// Runs heuristics in order and stops at the first one that yields a value.
pub fn first_match<I, O>(
    extractor: &str,
    field: &str,
    input: &I,
    attempts: &[(&str, Attempt<I, O>)],
) -> Option<O> {
    for (name, attempt) in attempts {
        if let Some(found) = attempt(input) {
            debug!(extractor, field, heuristic = *name, "heuristic matched");
            return Some(found);
        }
        debug!(extractor, field, heuristic = *name, "heuristic missed");
    }
    None
}

pub(crate) fn ensure_supported(extractor: &dyn Extractor, game: GameCode) -> Result<()> {
    if extractor.supports(game) {
        Ok(())
    } else {
        Err(CrawlError::extraction(
            extractor.name(),
            format!("source does not publish {}", game),
        ))
    }
}

/// Fields located independently by an extractor. Only a draft with both a
/// period and a full ball set becomes a `DrawResult`.
#[derive(Debug, Default)]
pub struct Draft {
    pub period: Option<String>,
    pub draw_date: Option<NaiveDate>,
    pub balls: Option<(Vec<u8>, Vec<u8>)>,
    pub sales: Option<i64>,
    pub pool_amount: Option<i64>,
    pub prizes: Vec<PrizeTier>,
}

impl Draft {
    pub fn finish(self, extractor: &str, ctx: &ExtractContext) -> Result<DrawResult> {
        let period = self.period.ok_or(CrawlError::PeriodUnresolved)?;
        let (primary_balls, secondary_balls) = self
            .balls
            .ok_or_else(|| CrawlError::extraction(extractor, "no winning numbers found"))?;

        let (draw_date, date_inferred) = match self.draw_date {
            Some(date) => (date, false),
            None => (ctx.reference_date, true),
        };

        Ok(DrawResult {
            game: ctx.game,
            period,
            draw_date,
            primary_balls,
            secondary_balls,
            date_inferred,
            sales: self.sales,
            pool_amount: self.pool_amount,
            prizes: self.prizes,
        })
    }
}
