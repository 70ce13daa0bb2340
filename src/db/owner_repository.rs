//! Owner repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::format_ts;

pub struct OwnerRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OwnerRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, user_id: &str) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM owners WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await
            .context("Failed to look up owner")?;

        Ok(found.is_some())
    }

    /// Returns false when the user was already an owner
    pub async fn insert(
        &self,
        user_id: &str,
        display_name: &str,
        added_by: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO owners (user_id, display_name, added_by, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(added_by)
        .bind(format_ts(now))
        .execute(self.pool)
        .await
        .context("Failed to add owner")?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM owners WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await
            .context("Failed to remove owner")?;

        Ok(result.rows_affected() > 0)
    }
}
