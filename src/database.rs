use rusqlite::{Connection, OptionalExtension, Result, params};
use std::fs;
use std::path::Path;

use crate::types::{DrawResult, DrawResultRow, GameCode, PrizeTier};

pub fn ensure_parent_dir(path: &str) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn create_database(path: &str) -> Result<Connection> {
    ensure_parent_dir(path).map_err(|e| {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
            Some(format!("Failed to create directory for {}: {}", path, e)),
        )
    })?;

    let conn = Connection::open(path)?;
    create_database_with_connection(&conn)?;
    Ok(conn)
}

pub fn create_database_with_connection(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS lottery_games (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            game_code TEXT NOT NULL UNIQUE,
            game_name TEXT NOT NULL,
            red_ball_count INTEGER NOT NULL,
            blue_ball_count INTEGER NOT NULL,
            red_select_count INTEGER NOT NULL,
            blue_select_count INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS draw_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            game_id INTEGER NOT NULL,
            period TEXT NOT NULL,
            red_balls TEXT NOT NULL,
            blue_balls TEXT NOT NULL,
            draw_date TEXT NOT NULL,
            sales_amount INTEGER,
            prize_pool INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (game_id) REFERENCES lottery_games (id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_draw_results_game_period
         ON draw_results (game_id, period)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS draw_prizes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            draw_id INTEGER NOT NULL,
            prize_level INTEGER NOT NULL,
            winner_count INTEGER NOT NULL,
            winner_bonus INTEGER NOT NULL,
            FOREIGN KEY (draw_id) REFERENCES draw_results (id)
        )",
        [],
    )?;

    for game in GameCode::ALL {
        let rules = game.rules();
        conn.execute(
            "INSERT OR IGNORE INTO lottery_games (
                game_code, game_name, red_ball_count, blue_ball_count,
                red_select_count, blue_select_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                game.code(),
                game.display_name(),
                rules.primary.max,
                rules.secondary.max,
                rules.primary.count as i64,
                rules.secondary.count as i64,
            ],
        )?;
    }

    Ok(())
}

pub fn find_game_id(conn: &Connection, game: GameCode) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM lottery_games WHERE game_code = ?1 AND is_active = 1",
        [game.code()],
        |row| row.get(0),
    )
    .optional()
}

pub fn draw_exists(conn: &Connection, game_id: i64, period: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM draw_results WHERE game_id = ?1 AND period = ?2",
        params![game_id, period],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Inserts the draw and its prize tiers in one transaction and returns the
/// new row id. A second insert of the same `(game_id, period)` violates the
/// unique index.
pub fn insert_draw_result(conn: &Connection, game_id: i64, draw: &DrawResult) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO draw_results (
            game_id, period, red_balls, blue_balls, draw_date, sales_amount, prize_pool
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            game_id,
            draw.period,
            balls_json(&draw.primary_balls),
            balls_json(&draw.secondary_balls),
            draw.draw_date.format("%Y-%m-%d").to_string(),
            draw.sales,
            draw.pool_amount,
        ],
    )?;
    let draw_id = tx.last_insert_rowid();

    save_prizes(&tx, draw_id, &draw.prizes)?;
    tx.commit()?;
    Ok(draw_id)
}

fn save_prizes(conn: &Connection, draw_id: i64, prizes: &[PrizeTier]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO draw_prizes (draw_id, prize_level, winner_count, winner_bonus)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for prize in prizes {
        stmt.execute(params![draw_id, prize.level, prize.winners, prize.payout])?;
    }
    Ok(())
}

pub fn get_latest_draws(conn: &Connection, game: GameCode, limit: i64) -> Result<Vec<DrawResultRow>> {
    let mut stmt = conn.prepare(
        "SELECT dr.id, dr.game_id, dr.period, dr.draw_date, dr.red_balls, dr.blue_balls,
                dr.sales_amount, dr.prize_pool, dr.created_at
         FROM draw_results dr
         JOIN lottery_games lg ON dr.game_id = lg.id
         WHERE lg.game_code = ?1
         ORDER BY dr.period DESC
         LIMIT ?2",
    )?;
    let draw_iter = stmt.query_map(params![game.code(), limit], draw_row)?;

    let mut results = Vec::new();
    for draw in draw_iter {
        results.push(draw?);
    }
    Ok(results)
}

pub fn get_draw_by_period(
    conn: &Connection,
    game: GameCode,
    period: &str,
) -> Result<Option<DrawResultRow>> {
    let mut stmt = conn.prepare(
        "SELECT dr.id, dr.game_id, dr.period, dr.draw_date, dr.red_balls, dr.blue_balls,
                dr.sales_amount, dr.prize_pool, dr.created_at
         FROM draw_results dr
         JOIN lottery_games lg ON dr.game_id = lg.id
         WHERE lg.game_code = ?1 AND dr.period = ?2",
    )?;
    stmt.query_row(params![game.code(), period], draw_row)
        .optional()
}

pub fn get_prizes_by_draw_id(conn: &Connection, draw_id: i64) -> Result<Vec<PrizeTier>> {
    let mut stmt = conn.prepare(
        "SELECT prize_level, winner_count, winner_bonus
         FROM draw_prizes WHERE draw_id = ?1 ORDER BY prize_level",
    )?;
    let prize_iter = stmt.query_map([draw_id], |row| {
        Ok(PrizeTier {
            level: row.get(0)?,
            winners: row.get(1)?,
            payout: row.get(2)?,
        })
    })?;

    let mut results = Vec::new();
    for prize in prize_iter {
        results.push(prize?);
    }
    Ok(results)
}

fn draw_row(row: &rusqlite::Row<'_>) -> Result<DrawResultRow> {
    let red: String = row.get(4)?;
    let blue: String = row.get(5)?;
    Ok(DrawResultRow {
        id: row.get(0)?,
        game_id: row.get(1)?,
        period: row.get(2)?,
        draw_date: row.get(3)?,
        red_balls: parse_balls(4, &red)?,
        blue_balls: parse_balls(5, &blue)?,
        sales_amount: row.get(6)?,
        prize_pool: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn balls_json(balls: &[u8]) -> String {
    serde_json::to_string(balls).unwrap_or_else(|_| "[]".to_string())
}

fn parse_balls(column: usize, raw: &str) -> Result<Vec<u8>> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}
