//! API key and session repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{format_ts, parse_ts};
use crate::models::{ApiKey, Session, SessionSource};

#[derive(Debug, sqlx::FromRow)]
struct ApiKeyRow {
    id: String,
    key_prefix: String,
    user_id: String,
    created_by: String,
    created_at: String,
}

impl TryFrom<ApiKeyRow> for ApiKey {
    type Error = anyhow::Error;

    fn try_from(row: ApiKeyRow) -> Result<Self> {
        Ok(ApiKey {
            id: Uuid::parse_str(&row.id).context("Invalid api key id")?,
            created_at: parse_ts(&row.created_at)?,
            key_prefix: row.key_prefix,
            user_id: row.user_id,
            created_by: row.created_by,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    user_id: String,
    api_key_id: Option<String>,
    key_code: Option<String>,
    logged_in_at: String,
}

impl TryFrom<SessionRow> for Session {
    type Error = anyhow::Error;

    fn try_from(row: SessionRow) -> Result<Self> {
        let source = match (row.api_key_id, row.key_code) {
            (Some(id), None) => {
                SessionSource::ApiKey(Uuid::parse_str(&id).context("Invalid session api key id")?)
            }
            (None, Some(code)) => SessionSource::RedeemedKey(code),
            _ => anyhow::bail!("Session for {} has no single source", row.user_id),
        };

        Ok(Session {
            logged_in_at: parse_ts(&row.logged_in_at)?,
            user_id: row.user_id,
            source,
        })
    }
}

pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert_api_key(
        &self,
        id: Uuid,
        key_hash: &str,
        key_prefix: &str,
        user_id: &str,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<ApiKey> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (id, key_hash, key_prefix, user_id, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(key_hash)
        .bind(key_prefix)
        .bind(user_id)
        .bind(created_by)
        .bind(format_ts(now))
        .execute(self.pool)
        .await
        .context("Failed to create api key")?;

        Ok(ApiKey {
            id,
            key_prefix: key_prefix.to_string(),
            user_id: user_id.to_string(),
            created_by: created_by.to_string(),
            created_at: now,
        })
    }

    pub async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>> {
        let row = sqlx::query_as::<_, ApiKeyRow>(
            r#"
            SELECT id, key_prefix, user_id, created_by, created_at
            FROM api_keys
            WHERE key_hash = ?
            "#,
        )
        .bind(key_hash)
        .fetch_optional(self.pool)
        .await
        .context("Failed to look up api key")?;

        row.map(ApiKey::try_from).transpose()
    }

    pub async fn list_api_keys_for_user(&self, user_id: &str) -> Result<Vec<ApiKey>> {
        let rows = sqlx::query_as::<_, ApiKeyRow>(
            r#"
            SELECT id, key_prefix, user_id, created_by, created_at
            FROM api_keys
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .context("Failed to list api keys")?;

        rows.into_iter().map(ApiKey::try_from).collect()
    }

    pub async fn delete_api_keys_for_user(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM api_keys WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await
            .context("Failed to delete api keys")?;

        Ok(result.rows_affected())
    }

    pub async fn get_session(&self, user_id: &str) -> Result<Option<Session>> {
        let mut conn = self.pool.acquire().await?;
        get_session(&mut conn, user_id).await
    }

    pub async fn insert_session(
        &self,
        user_id: &str,
        source: &SessionSource,
        now: DateTime<Utc>,
    ) -> Result<Session> {
        let mut conn = self.pool.acquire().await?;
        insert_session(&mut conn, user_id, source, now).await
    }

    pub async fn delete_session(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await
            .context("Failed to delete session")?;

        Ok(result.rows_affected() > 0)
    }
}

pub(crate) async fn get_session(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<Session>> {
    let row = sqlx::query_as::<_, SessionRow>(
        "SELECT user_id, api_key_id, key_code, logged_in_at FROM sessions WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to fetch session")?;

    row.map(Session::try_from).transpose()
}

/// Open a session. A second session for the same user is a UNIQUE violation.
pub(crate) async fn insert_session(
    conn: &mut SqliteConnection,
    user_id: &str,
    source: &SessionSource,
    now: DateTime<Utc>,
) -> Result<Session> {
    let (api_key_id, key_code) = match source {
        SessionSource::ApiKey(id) => (Some(id.to_string()), None),
        SessionSource::RedeemedKey(code) => (None, Some(code.as_str())),
    };

    sqlx::query(
        r#"
        INSERT INTO sessions (user_id, api_key_id, key_code, logged_in_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(api_key_id)
    .bind(key_code)
    .bind(format_ts(now))
    .execute(&mut *conn)
    .await
    .context("Failed to create session")?;

    Ok(Session {
        user_id: user_id.to_string(),
        source: source.clone(),
        logged_in_at: now,
    })
}
