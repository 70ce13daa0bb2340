//! Entitlement engine
//!
//! Whitelisting, blacklisting and HWID binding. Activity is never stored as
//! a derived flag: every check reads the entitlement and blacklist entry and
//! evaluates [`is_active_at`] against the current time.

use chrono::Utc;
use tracing::info;

use crate::config::BotConfig;
use crate::db::{BlacklistRepository, DbPool, EntitlementRepository, KeyRepository};
use crate::models::{
    days_after, is_active_at, BlacklistEntry, BlacklistTerm, Entitlement, UserStats,
    MAX_DURATION_DAYS,
};
use crate::services::locks::UserLocks;
use crate::utils::validation::validate_hwid;
use crate::utils::{AppError, AppResult};

pub struct EntitlementService {
    pool: DbPool,
    config: BotConfig,
    locks: UserLocks,
}

impl EntitlementService {
    pub fn new(pool: DbPool, config: BotConfig, locks: UserLocks) -> Self {
        Self {
            pool,
            config,
            locks,
        }
    }

    /// Grant access until `now + days`. Re-applying replaces the window.
    pub async fn whitelist(
        &self,
        user_id: &str,
        display_name: &str,
        days: i64,
    ) -> AppResult<Entitlement> {
        if days <= 0 {
            return Err(AppError::invalid_input("Days must be a positive number"));
        }
        let now = Utc::now();
        let expires_at = days_after(now, days).ok_or_else(|| {
            AppError::invalid_input(format!("Days cannot exceed {}", MAX_DURATION_DAYS))
        })?;

        let _guard = self.locks.lock(user_id).await;
        let entitlement = EntitlementRepository::new(&self.pool)
            .upsert_grant(user_id, display_name, expires_at, now)
            .await?;

        info!(user_id, days, expires_at = %entitlement.expires_at, "User whitelisted");
        Ok(entitlement)
    }

    /// Blacklist a user. `days == 0` is permanent. The entitlement is left
    /// alone; the blacklist masks it while in effect.
    pub async fn blacklist(
        &self,
        user_id: &str,
        display_name: &str,
        days: i64,
        reason: &str,
    ) -> AppResult<BlacklistEntry> {
        let now = Utc::now();
        if days < 0 {
            return Err(AppError::invalid_input("Days cannot be negative"));
        }
        let term = BlacklistTerm::from_days(days, now).ok_or_else(|| {
            AppError::invalid_input(format!("Days cannot exceed {}", MAX_DURATION_DAYS))
        })?;

        let _guard = self.locks.lock(user_id).await;
        let entry = BlacklistRepository::new(&self.pool)
            .upsert(user_id, display_name, reason, term, now)
            .await?;

        info!(
            user_id,
            permanent = term.is_permanent(),
            reason,
            "User blacklisted"
        );
        Ok(entry)
    }

    pub async fn unblacklist(&self, user_id: &str) -> AppResult<()> {
        let _guard = self.locks.lock(user_id).await;
        if !BlacklistRepository::new(&self.pool).delete(user_id).await? {
            return Err(AppError::not_found("User is not blacklisted"));
        }

        info!(user_id, "User removed from blacklist");
        Ok(())
    }

    pub async fn get_user(&self, user_id: &str) -> AppResult<Option<Entitlement>> {
        Ok(EntitlementRepository::new(&self.pool).get(user_id).await?)
    }

    pub async fn is_active(&self, user_id: &str) -> AppResult<bool> {
        let entitlement = EntitlementRepository::new(&self.pool).get(user_id).await?;
        let blacklist = BlacklistRepository::new(&self.pool).get(user_id).await?;
        Ok(is_active_at(
            entitlement.as_ref(),
            blacklist.as_ref(),
            Utc::now(),
        ))
    }

    pub async fn is_blacklisted(&self, user_id: &str) -> AppResult<bool> {
        Ok(self.blacklist_info(user_id).await?.is_some())
    }

    /// The user's blacklist entry, if one is in effect now
    pub async fn blacklist_info(&self, user_id: &str) -> AppResult<Option<BlacklistEntry>> {
        let now = Utc::now();
        let entry = BlacklistRepository::new(&self.pool).get(user_id).await?;
        Ok(entry.filter(|e| e.is_in_effect_at(now)))
    }

    /// Clear the HWID binding on behalf of `actor_name`
    pub async fn reset_hwid(&self, user_id: &str, actor_name: &str) -> AppResult<()> {
        let _guard = self.locks.lock(user_id).await;
        let cleared = EntitlementRepository::new(&self.pool)
            .set_hwid(user_id, None, Utc::now())
            .await?;
        if !cleared {
            return Err(AppError::not_found("User not found in the database"));
        }

        info!(user_id, reset_by = actor_name, "HWID reset");
        Ok(())
    }

    /// Reset from the panel, allowed only when the deployment enables it
    pub async fn self_reset_hwid(&self, user_id: &str) -> AppResult<()> {
        if !self.config.enable_self_hwid_reset {
            return Err(AppError::feature_disabled(
                "Self-service HWID reset is disabled. Contact an administrator.",
            ));
        }
        self.reset_hwid(user_id, user_id).await
    }

    /// Bind a hardware id to an active user. Binding the same value again is
    /// a no-op; a different value must be reset first.
    pub async fn bind_hwid(&self, user_id: &str, hwid: &str) -> AppResult<Entitlement> {
        if !validate_hwid(hwid) {
            return Err(AppError::invalid_input("Malformed hardware id"));
        }

        let _guard = self.locks.lock(user_id).await;
        let now = Utc::now();
        let repo = EntitlementRepository::new(&self.pool);
        let mut entitlement = repo
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found in the database"))?;

        let blacklist = BlacklistRepository::new(&self.pool).get(user_id).await?;
        if !is_active_at(Some(&entitlement), blacklist.as_ref(), now) {
            return Err(AppError::not_authorized("Whitelist is not active"));
        }

        match entitlement.hwid.as_deref() {
            Some(bound) if bound == hwid => return Ok(entitlement),
            Some(_) => {
                return Err(AppError::conflict(
                    "A different hardware id is already bound",
                ))
            }
            None => {}
        }

        repo.set_hwid(user_id, Some(hwid), now).await?;
        entitlement.hwid = Some(hwid.to_string());
        entitlement.updated_at = now;

        info!(user_id, "HWID bound");
        Ok(entitlement)
    }

    /// Users active right now
    pub async fn active_user_count(&self) -> AppResult<u64> {
        let now = Utc::now();
        let entitlements = EntitlementRepository::new(&self.pool).list_all().await?;
        let blacklist = BlacklistRepository::new(&self.pool).list_all().await?;

        let count = entitlements
            .iter()
            .filter(|e| {
                let entry = blacklist.iter().find(|b| b.user_id == e.user_id);
                is_active_at(Some(e), entry, now)
            })
            .count();
        Ok(count as u64)
    }

    pub async fn stats(&self, user_id: &str) -> AppResult<UserStats> {
        let now = Utc::now();
        let entitlement = EntitlementRepository::new(&self.pool).get(user_id).await?;
        let blacklist = BlacklistRepository::new(&self.pool).get(user_id).await?;
        let keys = KeyRepository::new(&self.pool);

        Ok(UserStats {
            active: is_active_at(entitlement.as_ref(), blacklist.as_ref(), now),
            hwid: entitlement.as_ref().and_then(|e| e.hwid.clone()),
            expires_at: entitlement.as_ref().map(|e| e.expires_at),
            blacklist: blacklist.filter(|b| b.is_in_effect_at(now)),
            total_active_users: self.active_user_count().await?,
            total_keys: keys.count_all().await?,
            redeemed_keys: keys.count_redeemed().await?,
        })
    }
}
