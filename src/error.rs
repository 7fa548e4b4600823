use thiserror::Error;

use crate::types::GameCode;

pub type Result<T> = std::result::Result<T, CrawlError>;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("extraction failed ({extractor}): {reason}")]
    ExtractionFailed { extractor: String, reason: String },

    #[error("normalization failed: expected {expected} ball tokens, found {found}")]
    NormalizationFailed { expected: usize, found: usize },

    #[error("no plausible period token found")]
    PeriodUnresolved,

    #[error("invalid draw: {0}")]
    ArityOrRangeInvalid(String),

    #[error("period {period} already recorded for {game}")]
    DuplicatePeriod { game: GameCode, period: String },

    #[error("game {0} is not registered in the store")]
    UnknownGame(GameCode),

    #[error("all {attempts} sources failed for {game}")]
    AllSourcesExhausted { game: GameCode, attempts: usize },

    #[error("fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl CrawlError {
    pub fn extraction(extractor: &str, reason: impl Into<String>) -> Self {
        CrawlError::ExtractionFailed {
            extractor: extractor.to_string(),
            reason: reason.into(),
        }
    }

    /// Duplicates are steady state once a period has been captured.
    pub fn is_benign(&self) -> bool {
        matches!(self, CrawlError::DuplicatePeriod { .. })
    }
}
