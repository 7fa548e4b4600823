use async_trait::async_trait;
use chrono::NaiveDate;
use lottery_crawler::api::{FetchRequest, Fetcher, RequestProfile};
use lottery_crawler::database::{get_draw_by_period, get_latest_draws, get_prizes_by_draw_id};
use lottery_crawler::extract::{Extractor, KaijiangExtractor};
use lottery_crawler::registry::Source;
use lottery_crawler::{
    CrawlError, Crawler, GameCode, GameOutcome, MemoryStore, Scheduler, SourceRegistry,
    SqliteStore,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SSQ_PAGE: &str = r#"
<html><body>
  <table class="kj_tablelist02">
    <tr><td>
      <span class="span_left">双色球 第 <font class="cfont2"><strong>25119</strong></font> 期
      开奖日期：2025年10月19日 兑奖截止日期：2025年12月17日</span>
    </td></tr>
    <tr><td>
      <div class="ball_box01"><ul>
        <li class="ball_red">04</li><li class="ball_red">07</li><li class="ball_red">18</li>
        <li class="ball_red">24</li><li class="ball_red">26</li><li class="ball_red">28</li>
        <li class="ball_blue">08</li>
      </ul></div>
    </td></tr>
  </table>
</body></html>"#;

fn sporttery_page(draws: &[(&str, &str, &str)]) -> String {
    let list: Vec<String> = draws
        .iter()
        .map(|(num, result, date)| {
            format!(
                r#"{{"lotteryDrawNum": "{}", "lotteryDrawResult": "{}", "lotteryDrawTime": "{}"}}"#,
                num, result, date
            )
        })
        .collect();
    format!(r#"{{"errorCode": "0", "value": {{"list": [{}]}}}}"#, list.join(","))
}

/// Serves canned bodies by URL and records every request.
#[derive(Default)]
struct StaticFetcher {
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl StaticFetcher {
    fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, request: &FetchRequest) -> lottery_crawler::Result<String> {
        self.requested.lock().unwrap().push(request.url.clone());
        self.pages
            .get(&request.url)
            .cloned()
            .ok_or(CrawlError::HttpStatus {
                url: request.url.clone(),
                status: 404,
            })
    }
}

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 20).unwrap()
}

fn crawler(
    registry: SourceRegistry,
    fetcher: Arc<StaticFetcher>,
    store: Arc<dyn lottery_crawler::DrawStore>,
) -> Crawler {
    Crawler::new(registry, fetcher, store)
        .with_reference_date(reference_date())
        .with_page_delay(Duration::ZERO)
}

fn endpoint(registry: &SourceRegistry, game: GameCode, idx: usize) -> String {
    registry.sources_for(game)[idx].endpoint.clone()
}

#[tokio::test]
async fn falls_back_in_priority_order_and_stops_at_first_success() {
    let extractor: Arc<dyn Extractor> = Arc::new(KaijiangExtractor);
    let mut registry = SourceRegistry::new();
    for (name, url, priority) in [
        ("third", "http://c.test/", 3),
        ("first", "http://a.test/", 1),
        ("second", "http://b.test/", 2),
    ] {
        registry.register(
            GameCode::Ssq,
            Source::new(name, url, priority, RequestProfile::html(), extractor.clone()),
        );
    }

    let fetcher = Arc::new(
        StaticFetcher::default()
            .with("http://a.test/", "<html><body>维护中</body></html>")
            .with("http://b.test/", SSQ_PAGE)
            .with("http://c.test/", SSQ_PAGE),
    );
    let crawler = crawler(registry, fetcher.clone(), Arc::new(MemoryStore::new()));

    let draw = crawler.acquire_latest(GameCode::Ssq).await.unwrap();
    assert_eq!(draw.period, "2025119");
    assert_eq!(fetcher.requested(), vec!["http://a.test/", "http://b.test/"]);
}

#[tokio::test]
async fn exhausting_every_source_reports_attempt_count() {
    let registry = SourceRegistry::with_defaults();
    let fetcher = Arc::new(StaticFetcher::default());
    let crawler = crawler(registry, fetcher.clone(), Arc::new(MemoryStore::new()));

    let err = crawler.acquire_latest(GameCode::Dlt).await.unwrap_err();
    assert!(matches!(
        err,
        CrawlError::AllSourcesExhausted { game: GameCode::Dlt, attempts: 2 }
    ));
    assert_eq!(fetcher.requested().len(), 2);

    let empty = crawler_without_sources();
    let err = empty.acquire_latest(GameCode::Ssq).await.unwrap_err();
    assert!(matches!(err, CrawlError::AllSourcesExhausted { attempts: 0, .. }));
}

fn crawler_without_sources() -> Crawler {
    crawler(
        SourceRegistry::new(),
        Arc::new(StaticFetcher::default()),
        Arc::new(MemoryStore::new()),
    )
}

#[tokio::test]
async fn latest_ssq_is_saved_once_in_sqlite() {
    let registry = SourceRegistry::with_defaults();
    let fetcher = Arc::new(
        StaticFetcher::default().with(endpoint(&registry, GameCode::Ssq, 0), SSQ_PAGE),
    );
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let crawler = crawler(registry, fetcher, store.clone());

    let stored = crawler.acquire_and_save(GameCode::Ssq).await.unwrap();
    assert_eq!(stored.draw.period, "2025119");
    assert_eq!(stored.draw.draw_date, NaiveDate::from_ymd_opt(2025, 10, 19).unwrap());
    assert_eq!(stored.draw.primary_balls, vec![4, 7, 18, 24, 26, 28]);
    assert_eq!(stored.draw.secondary_balls, vec![8]);

    let again = crawler.acquire_and_save(GameCode::Ssq).await.unwrap_err();
    assert!(matches!(again, CrawlError::DuplicatePeriod { .. }));

    let rows = store
        .with_conn(|conn| get_latest_draws(conn, GameCode::Ssq, 10))
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].draw_date, "2025-10-19");
}

#[tokio::test]
async fn plain_number_string_draw_is_stored_as_published() {
    let page = r#"
        <html><body>
          <p>双色球 第2025119期 开奖日期：2025-10-19</p>
          <div class="kjhm">4,7,18,24,26,28+8</div>
        </body></html>"#;
    let registry = SourceRegistry::with_defaults();
    let fetcher = Arc::new(
        StaticFetcher::default().with(endpoint(&registry, GameCode::Ssq, 0), page),
    );
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let crawler = crawler(registry, fetcher, store.clone());

    let stored = crawler.acquire_and_save(GameCode::Ssq).await.unwrap();
    assert!(!stored.draw.date_inferred);

    let row = store
        .with_conn(|conn| get_draw_by_period(conn, GameCode::Ssq, "2025119"))
        .unwrap()
        .expect("stored row");
    assert_eq!(row.id, stored.id);
    assert_eq!(row.draw_date, "2025-10-19");
    assert_eq!(row.red_balls, vec![4, 7, 18, 24, 26, 28]);
    assert_eq!(row.blue_balls, vec![8]);

    let prizes = store
        .with_conn(|conn| get_prizes_by_draw_id(conn, row.id))
        .unwrap();
    assert!(prizes.is_empty());
}

#[tokio::test]
async fn one_failing_game_does_not_block_the_other() {
    let registry = SourceRegistry::with_defaults();
    let fetcher = Arc::new(
        StaticFetcher::default().with(endpoint(&registry, GameCode::Ssq, 0), SSQ_PAGE),
    );
    let store = Arc::new(MemoryStore::new());
    let crawler = Arc::new(crawler(registry, fetcher, store.clone()));
    let scheduler = Scheduler::new(
        crawler,
        vec![GameCode::Dlt, GameCode::Ssq],
        Duration::from_secs(1800),
    );

    let report = scheduler.run_pass().await;
    assert!(matches!(
        report.outcome(GameCode::Dlt),
        Some(GameOutcome::Failed(CrawlError::AllSourcesExhausted { .. }))
    ));
    assert!(matches!(
        report.outcome(GameCode::Ssq),
        Some(GameOutcome::Saved { period }) if period == "2025119"
    ));

    let report = scheduler.run_pass().await;
    assert!(matches!(
        report.outcome(GameCode::Ssq),
        Some(GameOutcome::AlreadyRecorded { .. })
    ));
    assert_eq!(store.draws().len(), 1);
}

#[tokio::test]
async fn spawned_scheduler_runs_immediately_and_shuts_down() {
    let registry = SourceRegistry::with_defaults();
    let fetcher = Arc::new(
        StaticFetcher::default().with(endpoint(&registry, GameCode::Ssq, 0), SSQ_PAGE),
    );
    let store = Arc::new(MemoryStore::new());
    let crawler = Arc::new(crawler(registry, fetcher, store.clone()));

    let handle = Scheduler::new(crawler, vec![GameCode::Ssq], Duration::from_secs(3600)).spawn();
    for _ in 0..200 {
        if !store.draws().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.shutdown().await;

    assert_eq!(store.draws().len(), 1);
}

#[tokio::test]
async fn shutdown_before_first_tick_runs_no_pass() {
    let registry = SourceRegistry::with_defaults();
    let fetcher = Arc::new(
        StaticFetcher::default().with(endpoint(&registry, GameCode::Ssq, 0), SSQ_PAGE),
    );
    let store = Arc::new(MemoryStore::new());
    let crawler = Arc::new(crawler(registry, fetcher.clone(), store.clone()));

    let handle = Scheduler::new(crawler, vec![GameCode::Ssq], Duration::from_secs(3600)).spawn();
    handle.shutdown().await;

    assert!(fetcher.requested().is_empty());
    assert!(store.draws().is_empty());
}

#[tokio::test]
async fn history_walk_stops_on_empty_page_and_skips_bad_items() {
    let registry = SourceRegistry::with_defaults();
    let history = registry.history_for(GameCode::Dlt).unwrap().clone();
    let fetcher = Arc::new(
        StaticFetcher::default()
            .with(
                history.page_url(1, 2),
                sporttery_page(&[
                    ("25118", "02 08 09 12 21 04 05", "2025-10-18"),
                    ("25117", "01 11 14 25 27 04", "2025-10-15"),
                ]),
            )
            .with(
                history.page_url(2, 2),
                sporttery_page(&[("25116", "03 10 17 22 33 01 09", "2025-10-13")]),
            )
            .with(history.page_url(3, 2), sporttery_page(&[]))
            .with(
                history.page_url(4, 2),
                sporttery_page(&[("25115", "05 06 07 08 09 10 11", "2025-10-11")]),
            ),
    );
    let store = Arc::new(MemoryStore::new());
    let crawler = crawler(registry, fetcher.clone(), store.clone());

    let stats = crawler.crawl_history(GameCode::Dlt, 10, 2).await.unwrap();
    assert_eq!(stats.pages, 3);
    assert_eq!(stats.items, 3);
    assert_eq!(stats.saved, 2);
    assert_eq!(stats.skipped, 1);
    assert!(!fetcher.requested().contains(&history.page_url(4, 2)));

    let periods: Vec<String> = store.draws().into_iter().map(|d| d.period).collect();
    assert_eq!(periods, vec!["2025118", "2025116"]);

    let rerun = crawler.crawl_history(GameCode::Dlt, 10, 2).await.unwrap();
    assert_eq!(rerun.saved, 0);
    assert_eq!(rerun.duplicates, 2);
}

#[tokio::test]
async fn failed_history_page_is_skipped() {
    let registry = SourceRegistry::with_defaults();
    let history = registry.history_for(GameCode::Dlt).unwrap().clone();
    let fetcher = Arc::new(
        StaticFetcher::default()
            .with(
                history.page_url(2, 30),
                sporttery_page(&[("25118", "02 08 09 12 21 04 05", "2025-10-18")]),
            )
            .with(history.page_url(3, 30), sporttery_page(&[])),
    );
    let crawler = crawler(registry, fetcher, Arc::new(MemoryStore::new()));

    let stats = crawler.crawl_history(GameCode::Dlt, 5, 30).await.unwrap();
    assert_eq!(stats.pages, 2);
    assert_eq!(stats.saved, 1);

    let page = crawler.acquire_history_page(GameCode::Dlt, 2, 30).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].secondary_balls, vec![4, 5]);
}
