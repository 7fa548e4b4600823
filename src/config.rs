use anyhow::{Context, Result, bail};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::types::GameCode;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub crawl_interval: Duration,
    pub fetch_timeout: Duration,
    pub history_delay: Duration,
    pub history_page_size: u32,
    pub games: Vec<GameCode>,
}

pub fn load() -> Result<Config> {
    from_lookup(|key| env::var(key).ok())
}

/// Same as `load` with an injectable variable source.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let database_url = lookup("LOTTERY_DB_PATH").unwrap_or_else(|| "data/lottery.db".to_string());

    let crawl_interval = Duration::from_secs(number(&lookup, "LOTTERY_CRAWL_INTERVAL_SECS", 1800)?);
    let fetch_timeout = Duration::from_secs(number(&lookup, "LOTTERY_FETCH_TIMEOUT_SECS", 10)?);
    let history_delay = Duration::from_millis(number(&lookup, "LOTTERY_HISTORY_DELAY_MS", 1000)?);
    let history_page_size = number(&lookup, "LOTTERY_HISTORY_PAGE_SIZE", 30)?;

    if crawl_interval.is_zero() {
        bail!("LOTTERY_CRAWL_INTERVAL_SECS must be greater than zero");
    }
    if history_page_size == 0 {
        bail!("LOTTERY_HISTORY_PAGE_SIZE must be greater than zero");
    }

    let games = match lookup("LOTTERY_GAMES") {
        Some(raw) => parse_games(&raw)?,
        None => GameCode::ALL.to_vec(),
    };

    Ok(Config {
        database_url,
        crawl_interval,
        fetch_timeout,
        history_delay,
        history_page_size,
        games,
    })
}

fn number<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got '{}'", key, raw)),
        None => Ok(default),
    }
}

fn parse_games(raw: &str) -> Result<Vec<GameCode>> {
    let mut games = Vec::new();
    for code in raw.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let game: GameCode = code.parse().map_err(anyhow::Error::msg)?;
        if !games.contains(&game) {
            games.push(game);
        }
    }
    if games.is_empty() {
        bail!("LOTTERY_GAMES is set but names no game");
    }
    Ok(games)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_url, "data/lottery.db");
        assert_eq!(config.crawl_interval, Duration::from_secs(30 * 60));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.history_delay, Duration::from_secs(1));
        assert_eq!(config.history_page_size, 30);
        assert_eq!(config.games, vec![GameCode::Ssq, GameCode::Dlt]);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = from_lookup(lookup(&[
            ("LOTTERY_DB_PATH", "/tmp/draws.db"),
            ("LOTTERY_CRAWL_INTERVAL_SECS", "600"),
            ("LOTTERY_GAMES", "dlt, dlt"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "/tmp/draws.db");
        assert_eq!(config.crawl_interval, Duration::from_secs(600));
        assert_eq!(config.games, vec![GameCode::Dlt]);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(from_lookup(lookup(&[("LOTTERY_FETCH_TIMEOUT_SECS", "ten")])).is_err());
        assert!(from_lookup(lookup(&[("LOTTERY_CRAWL_INTERVAL_SECS", "0")])).is_err());
        assert!(from_lookup(lookup(&[("LOTTERY_GAMES", "ssq,kl8")])).is_err());
    }
}
