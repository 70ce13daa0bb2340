//! Access key repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use super::{format_ts, parse_opt_ts, parse_ts};
use crate::models::{Key, KeyStatus};

#[derive(Debug, sqlx::FromRow)]
struct KeyRow {
    code: String,
    duration_days: i64,
    status: String,
    created_by: String,
    redeemed_by: Option<String>,
    redeemed_at: Option<String>,
    created_at: String,
}

impl TryFrom<KeyRow> for Key {
    type Error = anyhow::Error;

    fn try_from(row: KeyRow) -> Result<Self> {
        Ok(Key {
            status: KeyStatus::parse(&row.status)
                .with_context(|| format!("Invalid key status: {}", row.status))?,
            redeemed_at: parse_opt_ts(row.redeemed_at.as_deref())?,
            created_at: parse_ts(&row.created_at)?,
            code: row.code,
            duration_days: row.duration_days,
            created_by: row.created_by,
            redeemed_by: row.redeemed_by,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT code, duration_days, status, created_by, redeemed_by, redeemed_at, created_at
    FROM keys
"#;

pub struct KeyRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> KeyRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an unused key. A duplicate code surfaces as a UNIQUE violation.
    pub async fn insert(
        &self,
        code: &str,
        duration_days: i64,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Key> {
        sqlx::query(
            r#"
            INSERT INTO keys (code, duration_days, status, created_by, created_at)
            VALUES (?, ?, 'unused', ?, ?)
            "#,
        )
        .bind(code)
        .bind(duration_days)
        .bind(created_by)
        .bind(format_ts(now))
        .execute(self.pool)
        .await
        .context("Failed to create key")?;

        Ok(Key {
            code: code.to_string(),
            duration_days,
            status: KeyStatus::Unused,
            created_by: created_by.to_string(),
            redeemed_by: None,
            redeemed_at: None,
            created_at: now,
        })
    }

    /// Insert unless the code exists. Returns true when a row was written.
    pub async fn insert_if_absent(
        &self,
        code: &str,
        duration_days: i64,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO keys (code, duration_days, status, created_by, created_at)
            VALUES (?, ?, 'unused', ?, ?)
            "#,
        )
        .bind(code)
        .bind(duration_days)
        .bind(created_by)
        .bind(format_ts(now))
        .execute(self.pool)
        .await
        .context("Failed to seed key")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, code: &str) -> Result<Option<Key>> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, code).await
    }

    /// All keys in creation order
    pub async fn list_all(&self) -> Result<Vec<Key>> {
        let rows = sqlx::query_as::<_, KeyRow>(&format!("{} ORDER BY seq", SELECT_COLUMNS))
            .fetch_all(self.pool)
            .await
            .context("Failed to list keys")?;

        rows.into_iter().map(Key::try_from).collect()
    }

    /// Code of the key most recently redeemed by `user_id`
    pub async fn latest_for_user(&self, user_id: &str) -> Result<Option<String>> {
        let code = sqlx::query_scalar::<_, String>(
            r#"
            SELECT code FROM keys
            WHERE redeemed_by = ? AND status = 'redeemed'
            ORDER BY redeemed_at DESC, seq DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await
        .context("Failed to look up redeemed key")?;

        Ok(code)
    }

    pub async fn count_all(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM keys")
            .fetch_one(self.pool)
            .await
            .context("Failed to count keys")?;
        Ok(count as u64)
    }

    pub async fn count_redeemed(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM keys WHERE status = 'redeemed'")
            .fetch_one(self.pool)
            .await
            .context("Failed to count redeemed keys")?;
        Ok(count as u64)
    }
}

pub(crate) async fn get(conn: &mut SqliteConnection, code: &str) -> Result<Option<Key>> {
    let row = sqlx::query_as::<_, KeyRow>(&format!("{} WHERE code = ?", SELECT_COLUMNS))
        .bind(code)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch key")?;

    row.map(Key::try_from).transpose()
}

/// Mark an unused key redeemed by `user_id`.
///
/// Compare-and-set on `status = 'unused'`: returns false when another
/// redeemer got there first.
pub(crate) async fn claim(
    conn: &mut SqliteConnection,
    code: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE keys
        SET status = 'redeemed', redeemed_by = ?, redeemed_at = ?
        WHERE code = ? AND status = 'unused'
        "#,
    )
    .bind(user_id)
    .bind(format_ts(now))
    .bind(code)
    .execute(&mut *conn)
    .await
    .context("Failed to claim key")?;

    Ok(result.rows_affected() == 1)
}
