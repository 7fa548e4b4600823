use anyhow::{Context, Result};
use rusqlite::Connection;

/// Opens the database file, creating its directory and schema on first use.
pub fn conn(database_url: &str) -> Result<Connection> {
    crate::database::create_database(database_url)
        .with_context(|| format!("opening database at {}", database_url))
}
