//! Storage port used by the persistence gate.

use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::database;
use crate::error::{CrawlError, Result};
use crate::types::{DrawResult, GameCode};

pub trait DrawStore: Send + Sync {
    fn game_id(&self, game: GameCode) -> Result<Option<i64>>;

    fn period_exists(&self, game_id: i64, period: &str) -> Result<bool>;

    fn insert(&self, game_id: i64, draw: &DrawResult) -> Result<i64>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        database::create_database_with_connection(&conn)?;
        Ok(Self::new(conn))
    }

    /// Read access for listing commands.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(f(&*conn)?)
    }
}

impl DrawStore for SqliteStore {
    fn game_id(&self, game: GameCode) -> Result<Option<i64>> {
        self.with_conn(|conn| database::find_game_id(conn, game))
    }

    fn period_exists(&self, game_id: i64, period: &str) -> Result<bool> {
        self.with_conn(|conn| database::draw_exists(conn, game_id, period))
    }

    fn insert(&self, game_id: i64, draw: &DrawResult) -> Result<i64> {
        let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match database::insert_draw_result(&conn, game_id, draw) {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(CrawlError::DuplicatePeriod {
                    game: draw.game,
                    period: draw.period.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    games: HashMap<GameCode, i64>,
    periods: HashSet<(i64, String)>,
    draws: Vec<(i64, i64, DrawResult)>,
}

impl MemoryStore {
    /// A store that knows both games.
    pub fn new() -> Self {
        Self::with_games(&GameCode::ALL)
    }

    pub fn with_games(games: &[GameCode]) -> Self {
        let store = Self::default();
        {
            let mut inner = store.lock();
            for (idx, game) in games.iter().enumerate() {
                inner.games.insert(*game, idx as i64 + 1);
            }
        }
        store
    }

    /// Stored draws in insertion order.
    pub fn draws(&self) -> Vec<DrawResult> {
        self.lock().draws.iter().map(|(_, _, d)| d.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DrawStore for MemoryStore {
    fn game_id(&self, game: GameCode) -> Result<Option<i64>> {
        Ok(self.lock().games.get(&game).copied())
    }

    fn period_exists(&self, game_id: i64, period: &str) -> Result<bool> {
        Ok(self.lock().periods.contains(&(game_id, period.to_string())))
    }

    fn insert(&self, game_id: i64, draw: &DrawResult) -> Result<i64> {
        let mut inner = self.lock();
        if !inner.periods.insert((game_id, draw.period.clone())) {
            return Err(CrawlError::DuplicatePeriod {
                game: draw.game,
                period: draw.period.clone(),
            });
        }
        let id = inner.draws.len() as i64 + 1;
        inner.draws.push((id, game_id, draw.clone()));
        Ok(id)
    }
}
