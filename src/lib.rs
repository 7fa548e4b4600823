pub mod api;
pub mod config;
pub mod connection;
pub mod crawler;
pub mod database;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod period;
pub mod persist;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod utils;

pub use crawler::{Crawler, HistoryStats};
pub use error::{CrawlError, Result};
pub use registry::SourceRegistry;
pub use scheduler::{GameOutcome, PassReport, Scheduler, SchedulerHandle};
pub use store::{DrawStore, MemoryStore, SqliteStore};
pub use types::{DrawResult, GameCode, StoredDraw};
