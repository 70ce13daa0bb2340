//! Blacklist repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{format_ts, parse_opt_ts, parse_ts};
use crate::models::{BlacklistEntry, BlacklistTerm};

#[derive(Debug, sqlx::FromRow)]
struct BlacklistRow {
    user_id: String,
    display_name: String,
    reason: String,
    permanent: bool,
    unblacklist_at: Option<String>,
    created_at: String,
}

impl TryFrom<BlacklistRow> for BlacklistEntry {
    type Error = anyhow::Error;

    fn try_from(row: BlacklistRow) -> Result<Self> {
        let term = match (row.permanent, parse_opt_ts(row.unblacklist_at.as_deref())?) {
            (true, None) => BlacklistTerm::Permanent,
            (false, Some(at)) => BlacklistTerm::Until(at),
            _ => anyhow::bail!("Blacklist entry for {} has an inconsistent term", row.user_id),
        };

        Ok(BlacklistEntry {
            created_at: parse_ts(&row.created_at)?,
            user_id: row.user_id,
            display_name: row.display_name,
            reason: row.reason,
            term,
        })
    }
}

pub struct BlacklistRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BlacklistRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Stored entry, whether or not it is still in effect
    pub async fn get(&self, user_id: &str) -> Result<Option<BlacklistEntry>> {
        let row = sqlx::query_as::<_, BlacklistRow>(
            r#"
            SELECT user_id, display_name, reason, permanent, unblacklist_at, created_at
            FROM blacklist
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await
        .context("Failed to fetch blacklist entry")?;

        row.map(BlacklistEntry::try_from).transpose()
    }

    pub async fn list_all(&self) -> Result<Vec<BlacklistEntry>> {
        let rows = sqlx::query_as::<_, BlacklistRow>(
            r#"
            SELECT user_id, display_name, reason, permanent, unblacklist_at, created_at
            FROM blacklist
            "#,
        )
        .fetch_all(self.pool)
        .await
        .context("Failed to list blacklist entries")?;

        rows.into_iter().map(BlacklistEntry::try_from).collect()
    }

    /// Insert or replace the user's entry
    pub async fn upsert(
        &self,
        user_id: &str,
        display_name: &str,
        reason: &str,
        term: BlacklistTerm,
        now: DateTime<Utc>,
    ) -> Result<BlacklistEntry> {
        sqlx::query(
            r#"
            INSERT INTO blacklist (user_id, display_name, reason, permanent, unblacklist_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                reason = excluded.reason,
                permanent = excluded.permanent,
                unblacklist_at = excluded.unblacklist_at,
                created_at = excluded.created_at
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(reason)
        .bind(term.is_permanent())
        .bind(term.unblacklist_at().map(format_ts))
        .bind(format_ts(now))
        .execute(self.pool)
        .await
        .context("Failed to write blacklist entry")?;

        Ok(BlacklistEntry {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            reason: reason.to_string(),
            term,
            created_at: now,
        })
    }

    pub async fn delete(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blacklist WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await
            .context("Failed to delete blacklist entry")?;

        Ok(result.rows_affected() > 0)
    }
}
