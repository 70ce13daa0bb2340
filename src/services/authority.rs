//! Owner and role authority
//!
//! Owners are the primary owner from deployment config plus the owner set in
//! storage. Managers hold the configured manager role (or a role literally
//! named `Manager` before any panel is configured). Owners pass every gate.

use chrono::Utc;
use tracing::info;

use crate::db::{DbPool, OwnerRepository, PanelRepository, SessionRepository};
use crate::models::{Actor, UserRef};
use crate::utils::{AppError, AppResult};

/// Role name used for the manager gate when no panel is configured
pub const FALLBACK_MANAGER_ROLE: &str = "Manager";

pub struct AuthorityService {
    pool: DbPool,
    primary_owner_id: String,
}

impl AuthorityService {
    pub fn new(pool: DbPool, primary_owner_id: impl Into<String>) -> Self {
        Self {
            pool,
            primary_owner_id: primary_owner_id.into(),
        }
    }

    pub fn is_primary_owner(&self, user_id: &str) -> bool {
        user_id == self.primary_owner_id
    }

    pub async fn is_owner(&self, user_id: &str) -> AppResult<bool> {
        if self.is_primary_owner(user_id) {
            return Ok(true);
        }
        Ok(OwnerRepository::new(&self.pool).exists(user_id).await?)
    }

    pub async fn has_manager_role(&self, actor: &Actor) -> AppResult<bool> {
        if self.is_owner(&actor.id).await? {
            return Ok(true);
        }

        let panel = PanelRepository::new(&self.pool).get().await?;
        Ok(match panel {
            Some(config) => actor.has_role_id(&config.manager_role_id),
            None => actor.has_role_named(FALLBACK_MANAGER_ROLE),
        })
    }

    /// Owners pass; everyone else needs an open session
    pub async fn require_authenticated(&self, actor: &Actor) -> AppResult<()> {
        if self.is_owner(&actor.id).await? {
            return Ok(());
        }
        match SessionRepository::new(&self.pool)
            .get_session(&actor.id)
            .await?
        {
            Some(_) => Ok(()),
            None => Err(AppError::not_authenticated("No active session")),
        }
    }

    /// Manager role first, then login
    pub async fn require_manager(&self, actor: &Actor) -> AppResult<()> {
        if !self.has_manager_role(actor).await? {
            return Err(AppError::not_authorized(
                "You need the Manager role to use this command",
            ));
        }
        self.require_authenticated(actor).await
    }

    pub async fn require_owner(&self, actor: &Actor) -> AppResult<()> {
        if !self.is_owner(&actor.id).await? {
            return Err(AppError::not_authorized(
                "Only owners can use this command",
            ));
        }
        Ok(())
    }

    /// Add `target` to the owner set. Returns false if already an owner.
    pub async fn add_owner(&self, actor: &Actor, target: &UserRef) -> AppResult<bool> {
        self.require_owner(actor).await?;
        if self.is_primary_owner(&target.id) {
            return Err(AppError::not_authorized(
                "The primary owner cannot be modified",
            ));
        }

        let added = OwnerRepository::new(&self.pool)
            .insert(&target.id, &target.display_name, &actor.id, Utc::now())
            .await?;
        if added {
            info!(owner_id = %target.id, added_by = %actor.id, "Owner added");
        }
        Ok(added)
    }

    /// Remove `target_id` from the owner set. Returns false if not an owner.
    pub async fn remove_owner(&self, actor: &Actor, target_id: &str) -> AppResult<bool> {
        self.require_owner(actor).await?;
        if self.is_primary_owner(target_id) {
            return Err(AppError::not_authorized(
                "The primary owner cannot be removed",
            ));
        }

        let removed = OwnerRepository::new(&self.pool).delete(target_id).await?;
        if removed {
            info!(owner_id = target_id, removed_by = %actor.id, "Owner removed");
        }
        Ok(removed)
    }
}
