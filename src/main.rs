use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lottery_crawler::api::HttpFetcher;
use lottery_crawler::config::{self, Config};
use lottery_crawler::connection::conn;
use lottery_crawler::database::{get_draw_by_period, get_latest_draws, get_prizes_by_draw_id};
use lottery_crawler::{CrawlError, Crawler, GameCode, Scheduler, SourceRegistry, SqliteStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lottery-crawler")]
#[command(about = "Collects official 双色球 and 大乐透 draw results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the latest draw and print it without saving
    Test {
        #[arg(short, long, default_value = "ssq")]
        game: GameCode,
    },
    /// Fetch the latest draw and save it
    Crawl {
        #[arg(short, long, default_value = "ssq")]
        game: GameCode,
    },
    /// Walk the history listing and save every new draw
    History {
        #[arg(short, long, default_value = "ssq")]
        game: GameCode,
        /// Number of pages to walk
        #[arg(short, long, default_value = "1")]
        pages: u32,
        /// Draws per page, defaults to LOTTERY_HISTORY_PAGE_SIZE
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Poll every configured game until Ctrl+C
    Schedule,
    /// List stored draws, or one draw with its prize tiers
    Show {
        #[arg(short, long, default_value = "ssq")]
        game: GameCode,
        #[arg(short, long, default_value = "10")]
        limit: i64,
        /// Seven-digit period such as 2025119
        #[arg(long)]
        period: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    let store = Arc::new(SqliteStore::new(conn(&config.database_url)?));
    let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout).context("building HTTP client")?);
    let crawler = Crawler::new(SourceRegistry::with_defaults(), fetcher, store.clone())
        .with_page_delay(config.history_delay);

    match cli.command {
        Commands::Test { game } => test_sources(&crawler, game).await,
        Commands::Crawl { game } => crawl(&crawler, game).await,
        Commands::History {
            game,
            pages,
            page_size,
        } => {
            let size = page_size.unwrap_or(config.history_page_size);
            let stats = crawler.crawl_history(game, pages, size).await?;
            println!(
                "📚 {}: {} pages, {} items, {} saved, {} already recorded, {} skipped",
                game, stats.pages, stats.items, stats.saved, stats.duplicates, stats.skipped
            );
            Ok(())
        }
        Commands::Schedule => schedule(crawler, &config).await,
        Commands::Show {
            game,
            period: Some(period),
            ..
        } => show_period(&store, game, &period),
        Commands::Show { game, limit, .. } => {
            let rows = store.with_conn(|conn| get_latest_draws(conn, game, limit))?;
            if rows.is_empty() {
                println!("No {} draws stored yet.", game.display_name());
            }
            for row in rows {
                println!(
                    "{} {} {:?} + {:?}",
                    row.period, row.draw_date, row.red_balls, row.blue_balls
                );
            }
            Ok(())
        }
    }
}

fn show_period(store: &SqliteStore, game: GameCode, period: &str) -> Result<()> {
    let Some(row) = store.with_conn(|conn| get_draw_by_period(conn, game, period))? else {
        println!("No {} draw {} stored.", game.display_name(), period);
        return Ok(());
    };
    println!(
        "{} {} {:?} + {:?}",
        row.period, row.draw_date, row.red_balls, row.blue_balls
    );

    let prizes = store.with_conn(|conn| get_prizes_by_draw_id(conn, row.id))?;
    for prize in prizes {
        println!(
            "   level {}: {} winners, {}.{:02} 元",
            prize.level,
            prize.winners,
            prize.payout / 100,
            prize.payout % 100
        );
    }
    Ok(())
}

async fn test_sources(crawler: &Crawler, game: GameCode) -> Result<()> {
    let draw = crawler.acquire_latest(game).await?;
    println!("🎲 {} {}", game.display_name(), draw.period);
    println!("   date: {}{}", draw.draw_date, if draw.date_inferred { " (inferred)" } else { "" });
    println!("   numbers: {:?} + {:?}", draw.primary_balls, draw.secondary_balls);
    if let Some(sales) = draw.sales {
        println!("   sales: {}.{:02} 元", sales / 100, sales % 100);
    }
    if let Some(pool) = draw.pool_amount {
        println!("   pool: {}.{:02} 元", pool / 100, pool % 100);
    }
    Ok(())
}

async fn crawl(crawler: &Crawler, game: GameCode) -> Result<()> {
    match crawler.acquire_and_save(game).await {
        Ok(stored) => {
            println!("✓ {} {} saved with id {}", game, stored.draw.period, stored.id);
            Ok(())
        }
        Err(CrawlError::DuplicatePeriod { period, .. }) => {
            println!("✓ {} {} already recorded", game, period);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn schedule(crawler: Crawler, config: &Config) -> Result<()> {
    let scheduler = Scheduler::new(Arc::new(crawler), config.games.clone(), config.crawl_interval);
    let handle = scheduler.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl+C")?;
    tracing::info!("shutdown requested");
    handle.shutdown().await;
    Ok(())
}
