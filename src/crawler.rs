//! Fallback orchestration over the registered sources, plus paged history
//! acquisition.

use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{FetchRequest, Fetcher};
use crate::error::{CrawlError, Result};
use crate::extract::ExtractContext;
use crate::normalize;
use crate::persist;
use crate::registry::{Source, SourceRegistry};
use crate::store::DrawStore;
use crate::types::{DrawResult, GameCode, StoredDraw};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HistoryStats {
    pub pages: u32,
    pub items: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

pub struct Crawler {
    registry: SourceRegistry,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn DrawStore>,
    reference_date: Option<NaiveDate>,
    page_delay: Duration,
    game_locks: HashMap<GameCode, Mutex<()>>,
}

impl Crawler {
    pub fn new(
        registry: SourceRegistry,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn DrawStore>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            store,
            reference_date: None,
            page_delay: Duration::from_secs(1),
            game_locks: GameCode::ALL.iter().map(|g| (*g, Mutex::new(()))).collect(),
        }
    }

    /// Pins "today". Without it the local date is used per acquisition.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Pause between history page requests.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    fn context(&self, game: GameCode) -> ExtractContext {
        let today = self
            .reference_date
            .unwrap_or_else(|| Local::now().date_naive());
        ExtractContext::new(game, today)
    }

    /// Tries each source in priority order and returns the first validated
    /// draft. No source is retried within one call.
    pub async fn acquire_latest(&self, game: GameCode) -> Result<DrawResult> {
        let sources = self.registry.sources_for(game);
        let ctx = self.context(game);

        for (idx, source) in sources.iter().enumerate() {
            debug!(%game, source = %source.name, attempt = idx + 1, "trying source");
            match self.try_source(source, &ctx).await {
                Ok(draw) => {
                    info!(
                        %game,
                        source = %source.name,
                        period = %draw.period,
                        date = %draw.draw_date,
                        "draw acquired"
                    );
                    return Ok(draw);
                }
                Err(e) => {
                    warn!(%game, source = %source.name, error = %e, "source failed, trying next");
                }
            }
        }

        Err(CrawlError::AllSourcesExhausted {
            game,
            attempts: sources.len(),
        })
    }

    async fn try_source(&self, source: &Source, ctx: &ExtractContext) -> Result<DrawResult> {
        let request = FetchRequest::new(source.endpoint.clone(), source.profile.clone());
        let body = self.fetcher.fetch(&request).await?;
        let draw = source.extractor.extract(&body, ctx)?;
        normalize::validate(&draw)?;
        Ok(draw)
    }

    pub fn save(&self, draw: DrawResult) -> Result<StoredDraw> {
        persist::save_draw_result(self.store.as_ref(), draw)
    }

    /// Acquire and persist under the game's lock so scheduled and on-demand
    /// runs for one game never interleave.
    pub async fn acquire_and_save(&self, game: GameCode) -> Result<StoredDraw> {
        let _guard = self.lock(game).await;
        let draw = self.acquire_latest(game).await?;
        self.save(draw)
    }

    async fn lock(&self, game: GameCode) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        match self.game_locks.get(&game) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }

    /// Valid drafts from one history page. Malformed items are logged and
    /// left out.
    pub async fn acquire_history_page(
        &self,
        game: GameCode,
        page: u32,
        size: u32,
    ) -> Result<Vec<DrawResult>> {
        self.history_page(game, page, size)
            .await
            .map(|(draws, _)| draws)
    }

    async fn history_page(
        &self,
        game: GameCode,
        page: u32,
        size: u32,
    ) -> Result<(Vec<DrawResult>, usize)> {
        let source = self
            .registry
            .history_for(game)
            .ok_or(CrawlError::AllSourcesExhausted { game, attempts: 0 })?;
        let ctx = self.context(game);

        let request = FetchRequest::new(source.page_url(page, size), source.profile.clone());
        let body = self.fetcher.fetch(&request).await?;
        let items = source.extractor.extract_page(&body, &ctx)?;

        let mut draws = Vec::with_capacity(items.len());
        let mut skipped = 0;
        for (idx, item) in items.into_iter().enumerate() {
            match item.and_then(|draw| normalize::validate(&draw).map(|_| draw)) {
                Ok(draw) => draws.push(draw),
                Err(e) => {
                    skipped += 1;
                    warn!(%game, page, item = idx, error = %e, "skipping history item");
                }
            }
        }
        debug!(%game, page, valid = draws.len(), skipped, "history page read");
        Ok((draws, skipped))
    }

    /// Walks history pages from 1 until an empty page or `max_pages`,
    /// persisting new draws. A failed page is logged and the walk moves on.
    pub async fn crawl_history(
        &self,
        game: GameCode,
        max_pages: u32,
        size: u32,
    ) -> Result<HistoryStats> {
        let source = self
            .registry
            .history_for(game)
            .ok_or(CrawlError::AllSourcesExhausted { game, attempts: 0 })?;
        info!(%game, source = %source.name, max_pages, size, "history crawl started");

        let mut stats = HistoryStats::default();
        for page in 1..=max_pages {
            if page > 1 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let (draws, skipped) = match self.history_page(game, page, size).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(%game, page, error = %e, "history page failed");
                    continue;
                }
            };
            stats.pages += 1;
            if draws.is_empty() && skipped == 0 {
                info!(%game, page, "empty history page, stopping");
                break;
            }

            stats.items += draws.len() + skipped;
            stats.skipped += skipped;
            for draw in draws {
                let _guard = self.lock(game).await;
                match self.save(draw) {
                    Ok(_) => stats.saved += 1,
                    Err(e) if e.is_benign() => stats.duplicates += 1,
                    Err(e) => {
                        stats.skipped += 1;
                        warn!(%game, page, error = %e, "history draw not saved");
                    }
                }
            }
        }

        info!(
            %game,
            pages = stats.pages,
            items = stats.items,
            saved = stats.saved,
            duplicates = stats.duplicates,
            skipped = stats.skipped,
            "history crawl finished"
        );
        Ok(stats)
    }
}
