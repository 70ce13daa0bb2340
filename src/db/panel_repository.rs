//! Panel configuration repository (single row, id = 1)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::{format_ts, parse_ts};
use crate::models::PanelConfig;

#[derive(Debug, sqlx::FromRow)]
struct PanelRow {
    channel_id: String,
    script_template: String,
    buyer_role_id: String,
    manager_role_id: String,
    panel_message_id: Option<String>,
    updated_at: String,
}

pub struct PanelRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PanelRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> Result<Option<PanelConfig>> {
        let row = sqlx::query_as::<_, PanelRow>(
            r#"
            SELECT channel_id, script_template, buyer_role_id, manager_role_id,
                   panel_message_id, updated_at
            FROM panel_config
            WHERE id = 1
            "#,
        )
        .fetch_optional(self.pool)
        .await
        .context("Failed to fetch panel configuration")?;

        row.map(|row| {
            Ok(PanelConfig {
                updated_at: parse_ts(&row.updated_at)?,
                channel_id: row.channel_id,
                script_template: row.script_template,
                buyer_role_id: row.buyer_role_id,
                manager_role_id: row.manager_role_id,
                panel_message_id: row.panel_message_id,
            })
        })
        .transpose()
    }

    /// Replace the configuration. The posted panel message id is cleared.
    pub async fn replace(
        &self,
        channel_id: &str,
        script_template: &str,
        buyer_role_id: &str,
        manager_role_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PanelConfig> {
        sqlx::query(
            r#"
            INSERT INTO panel_config
                (id, channel_id, script_template, buyer_role_id, manager_role_id, panel_message_id, updated_at)
            VALUES (1, ?, ?, ?, ?, NULL, ?)
            ON CONFLICT(id) DO UPDATE SET
                channel_id = excluded.channel_id,
                script_template = excluded.script_template,
                buyer_role_id = excluded.buyer_role_id,
                manager_role_id = excluded.manager_role_id,
                panel_message_id = NULL,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(channel_id)
        .bind(script_template)
        .bind(buyer_role_id)
        .bind(manager_role_id)
        .bind(format_ts(now))
        .execute(self.pool)
        .await
        .context("Failed to save panel configuration")?;

        Ok(PanelConfig {
            channel_id: channel_id.to_string(),
            script_template: script_template.to_string(),
            buyer_role_id: buyer_role_id.to_string(),
            manager_role_id: manager_role_id.to_string(),
            panel_message_id: None,
            updated_at: now,
        })
    }

    /// Returns false when no configuration exists yet
    pub async fn set_message_id(&self, message_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE panel_config SET panel_message_id = ?, updated_at = ? WHERE id = 1",
        )
        .bind(message_id)
        .bind(format_ts(now))
        .execute(self.pool)
        .await
        .context("Failed to record panel message")?;

        Ok(result.rows_affected() > 0)
    }
}
