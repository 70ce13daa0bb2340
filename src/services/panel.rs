//! Panel configuration and script resolution

use chrono::Utc;
use tracing::info;
use validator::Validate;

use crate::db::{DbPool, KeyRepository, PanelRepository};
use crate::models::{render_script, PanelConfig, SetPanelRequest, NO_KEY_ASSIGNED};
use crate::utils::{AppError, AppResult};

pub struct PanelService {
    pool: DbPool,
    default_template: String,
}

impl PanelService {
    pub fn new(pool: DbPool, default_template: impl Into<String>) -> Self {
        Self {
            pool,
            default_template: default_template.into(),
        }
    }

    pub async fn get(&self) -> AppResult<Option<PanelConfig>> {
        Ok(PanelRepository::new(&self.pool).get().await?)
    }

    /// Replace the singleton configuration (last writer wins)
    pub async fn set(&self, req: &SetPanelRequest) -> AppResult<PanelConfig> {
        req.validate()?;

        let config = PanelRepository::new(&self.pool)
            .replace(
                &req.channel_id,
                &req.script_template,
                &req.buyer_role_id,
                &req.manager_role_id,
                Utc::now(),
            )
            .await?;

        info!(
            channel_id = %config.channel_id,
            buyer_role_id = %config.buyer_role_id,
            manager_role_id = %config.manager_role_id,
            "Panel configured"
        );
        Ok(config)
    }

    /// Record the id of the posted panel message
    pub async fn set_message_id(&self, message_id: &str) -> AppResult<()> {
        let updated = PanelRepository::new(&self.pool)
            .set_message_id(message_id, Utc::now())
            .await?;
        if !updated {
            return Err(AppError::not_found(
                "Panel not configured. Use /setpanel first.",
            ));
        }
        Ok(())
    }

    /// The user's script: configured (or default) template with `{{KEY}}`
    /// replaced by their most recently redeemed key
    pub async fn resolve_script(&self, user_id: &str) -> AppResult<String> {
        let template = match PanelRepository::new(&self.pool).get().await? {
            Some(config) => config.script_template,
            None => self.default_template.clone(),
        };
        let key = KeyRepository::new(&self.pool)
            .latest_for_user(user_id)
            .await?
            .unwrap_or_else(|| NO_KEY_ASSIGNED.to_string());

        Ok(render_script(&template, &key))
    }
}
