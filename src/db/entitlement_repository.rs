//! Entitlement repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use super::{format_ts, parse_ts};
use crate::models::{Entitlement, EntitlementStatus};

#[derive(Debug, sqlx::FromRow)]
struct EntitlementRow {
    user_id: String,
    display_name: String,
    status: String,
    expires_at: String,
    hwid: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = anyhow::Error;

    fn try_from(row: EntitlementRow) -> Result<Self> {
        Ok(Entitlement {
            status: EntitlementStatus::parse(&row.status)
                .with_context(|| format!("Invalid entitlement status: {}", row.status))?,
            expires_at: parse_ts(&row.expires_at)?,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
            user_id: row.user_id,
            display_name: row.display_name,
            hwid: row.hwid,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT user_id, display_name, status, expires_at, hwid, created_at, updated_at FROM entitlements";

pub struct EntitlementRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> EntitlementRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<Entitlement>> {
        let mut conn = self.pool.acquire().await?;
        get(&mut conn, user_id).await
    }

    pub async fn list_all(&self) -> Result<Vec<Entitlement>> {
        let rows = sqlx::query_as::<_, EntitlementRow>(&format!(
            "{} ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .fetch_all(self.pool)
        .await
        .context("Failed to list entitlements")?;

        rows.into_iter().map(Entitlement::try_from).collect()
    }

    /// Create or extend a grant so it runs until `expires_at`
    pub async fn upsert_grant(
        &self,
        user_id: &str,
        display_name: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Entitlement> {
        let mut conn = self.pool.acquire().await?;
        upsert_grant(&mut conn, user_id, display_name, expires_at, now).await
    }

    /// Set or clear the HWID binding. Returns false if there is no entitlement.
    pub async fn set_hwid(
        &self,
        user_id: &str,
        hwid: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE entitlements SET hwid = ?, updated_at = ? WHERE user_id = ?")
                .bind(hwid)
                .bind(format_ts(now))
                .bind(user_id)
                .execute(self.pool)
                .await
                .context("Failed to update hwid")?;

        Ok(result.rows_affected() > 0)
    }
}

pub(crate) async fn get(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<Entitlement>> {
    let row = sqlx::query_as::<_, EntitlementRow>(&format!("{} WHERE user_id = ?", SELECT_COLUMNS))
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch entitlement")?;

    row.map(Entitlement::try_from).transpose()
}

/// Insert or overwrite the grant window. The HWID binding and creation time
/// of an existing row are kept.
pub(crate) async fn upsert_grant(
    conn: &mut SqliteConnection,
    user_id: &str,
    display_name: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Entitlement> {
    let now_str = format_ts(now);

    sqlx::query(
        r#"
        INSERT INTO entitlements (user_id, display_name, status, expires_at, hwid, created_at, updated_at)
        VALUES (?, ?, 'active', ?, NULL, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            display_name = excluded.display_name,
            status = 'active',
            expires_at = excluded.expires_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(display_name)
    .bind(format_ts(expires_at))
    .bind(&now_str)
    .bind(&now_str)
    .execute(&mut *conn)
    .await
    .context("Failed to write entitlement")?;

    get(conn, user_id)
        .await?
        .context("Failed to retrieve written entitlement")
}
