use std::str::FromStr;

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Sqlite, SqlitePool, Transaction,
};

use crate::config::AppConfig;

/// Open the connection pool, creating the database file when it is missing.
pub async fn connect(config: &AppConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("parse DATABASE_URL {}", config.database_url))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .context("connect to database")
}

/// Single-connection in-memory store, used by tests.
///
/// Every `sqlite::memory:` connection is its own database, so the pool is
/// pinned to one connection that never expires.
#[cfg(test)]
pub async fn connect_in_memory() -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .context("connect to in-memory database")?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

/// Open a transaction that holds the write lock from its first statement.
///
/// A deferred transaction that reads before it writes cannot upgrade its lock
/// while another writer is active; SQLite fails it with `SQLITE_BUSY` without
/// waiting. Starting with a write that matches no rows takes the lock up
/// front, where the connection's busy timeout applies.
pub async fn begin_write(db: &SqlitePool) -> sqlx::Result<Transaction<'static, Sqlite>> {
    let mut tx = db.begin().await?;
    sqlx::query("UPDATE users SET id = id WHERE 0")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

/// Encode an ordered sequence as the JSON text stored in list columns.
pub fn to_json_text<T: Serialize>(items: &[T]) -> anyhow::Result<String> {
    serde_json::to_string(items).context("encode list column")
}

/// Decode a list column. `NULL`, empty text and JSON `null` all read as empty.
pub fn from_json_text<T: DeserializeOwned>(raw: Option<&str>) -> anyhow::Result<Vec<T>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(text) => {
            let items: Option<Vec<T>> =
                serde_json::from_str(text).context("decode list column")?;
            Ok(items.unwrap_or_default())
        }
    }
}
