//! Database layer
//!
//! SQLite storage for entitlements, keys, API keys and sessions, blacklist
//! entries, owners and the panel configuration.
//!
//! Repositories borrow the pool for ordinary reads and writes. Steps that
//! must commit together (key redemption) are exposed as free functions over
//! a `SqliteConnection` so they can run inside one transaction.

pub mod blacklist_repository;
pub mod entitlement_repository;
pub mod key_repository;
pub mod owner_repository;
pub mod panel_repository;
pub mod session_repository;

pub use blacklist_repository::BlacklistRepository;
pub use entitlement_repository::EntitlementRepository;
pub use key_repository::KeyRepository;
pub use owner_repository::OwnerRepository;
pub use panel_repository::PanelRepository;
pub use session_repository::SessionRepository;

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Pool, Sqlite};

use crate::config::DatabaseConfig;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool and run migrations
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await
        .with_context(|| format!("Failed to connect to database: {}", config.url))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Check the database answers queries
pub async fn ping(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Database ping failed")?;
    Ok(())
}

/// Fixed-width UTC timestamp, so stored values sort lexicographically
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(ts: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid stored timestamp: {}", ts))
}

pub(crate) fn parse_opt_ts(ts: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    ts.map(parse_ts).transpose()
}
