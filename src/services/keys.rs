//! Key store service
//!
//! Creation, batch generation and redemption of access keys. Redemption runs
//! in one transaction: the key is claimed with a compare-and-set, then the
//! entitlement is granted and a session opened.

use chrono::{Duration, Utc};
use rand::Rng;
use tracing::{info, warn};

use crate::config::{BotConfig, RedeemGrantPolicy};
use crate::db::{
    entitlement_repository, key_repository, session_repository, BlacklistRepository, DbPool,
    KeyRepository,
};
use crate::models::{
    clamp_batch_size, days_after, Entitlement, Key, KeyStatus, SessionSource, MAX_DURATION_DAYS,
};
use crate::services::locks::UserLocks;
use crate::utils::validation::validate_key_code;
use crate::utils::{AppError, AppResult};

/// Codes seeded at startup when enabled
pub const DEMO_KEY_CODES: [&str; 5] = [
    "DEMO-KEY-1",
    "DEMO-KEY-2",
    "DEMO-KEY-3",
    "DEMO-KEY-4",
    "DEMO-KEY-5",
];

const DEMO_KEY_DAYS: i64 = 30;
const SYSTEM_ACTOR: &str = "system";
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn check_duration_days(duration_days: i64) -> AppResult<()> {
    if duration_days <= 0 {
        return Err(AppError::invalid_input("Duration must be at least one day"));
    }
    if duration_days > MAX_DURATION_DAYS {
        return Err(AppError::invalid_input(format!(
            "Duration cannot exceed {} days",
            MAX_DURATION_DAYS
        )));
    }
    Ok(())
}

/// Generate `KEY-<unix millis>-<8 chars of [A-Z0-9]>`
pub fn generate_key_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("KEY-{}-{}", Utc::now().timestamp_millis(), suffix)
}

pub struct KeyService {
    pool: DbPool,
    config: BotConfig,
    locks: UserLocks,
}

impl KeyService {
    pub fn new(pool: DbPool, config: BotConfig, locks: UserLocks) -> Self {
        Self {
            pool,
            config,
            locks,
        }
    }

    /// Create a single key with an explicit code
    pub async fn create_key(
        &self,
        code: &str,
        duration_days: i64,
        created_by: &str,
    ) -> AppResult<Key> {
        if !validate_key_code(code) {
            return Err(AppError::invalid_input(
                "Key codes are 1-64 characters of letters, digits, '-' and '_'",
            ));
        }
        check_duration_days(duration_days)?;

        let repo = KeyRepository::new(&self.pool);
        let key = repo
            .insert(code, duration_days, created_by, Utc::now())
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => AppError::conflict("A key with that code already exists"),
                other => other,
            })?;

        info!(code = %key.code, duration_days, created_by, "Key created");
        Ok(key)
    }

    /// Generate up to [`crate::models::MAX_BATCH_SIZE`] keys. Each insert stands alone; a
    /// failed insert is logged and skipped.
    pub async fn generate_batch(
        &self,
        count: i64,
        duration_days: i64,
        created_by: &str,
    ) -> AppResult<Vec<Key>> {
        let count = clamp_batch_size(count)
            .ok_or_else(|| AppError::invalid_input("Amount must be at least 1"))?;
        check_duration_days(duration_days)?;

        let repo = KeyRepository::new(&self.pool);
        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            let code = generate_key_code();
            match repo.insert(&code, duration_days, created_by, Utc::now()).await {
                Ok(key) => keys.push(key),
                Err(e) => warn!(code = %code, error = %e, "Skipping key that failed to insert"),
            }
        }

        info!(
            requested = count,
            created = keys.len(),
            duration_days,
            created_by,
            "Key batch generated"
        );
        Ok(keys)
    }

    /// Redeem `code` for `user_id`, granting an entitlement and a session
    pub async fn redeem(
        &self,
        user_id: &str,
        display_name: &str,
        code: &str,
    ) -> AppResult<Entitlement> {
        let code = code.trim();
        let _guard = self.locks.lock(user_id).await;
        let now = Utc::now();

        let blacklist = BlacklistRepository::new(&self.pool).get(user_id).await?;
        if blacklist.is_some_and(|b| b.is_in_effect_at(now)) {
            return Err(AppError::not_authorized("You are blacklisted"));
        }

        let mut tx = self.pool.begin().await?;

        let key = key_repository::get(&mut *tx, code)
            .await?
            .ok_or_else(|| AppError::not_found("Invalid key"))?;

        match key.status_at(now, self.config.unused_key_ttl_days) {
            KeyStatus::Unused => {}
            KeyStatus::Redeemed => {
                return Err(AppError::conflict("This key has already been redeemed"))
            }
            KeyStatus::Expired => return Err(AppError::conflict("This key has expired")),
        }

        if session_repository::get_session(&mut *tx, user_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("You are already logged in"));
        }
        if entitlement_repository::get(&mut *tx, user_id)
            .await?
            .is_some_and(|e| e.is_current_at(now))
        {
            return Err(AppError::conflict("You already have an active whitelist"));
        }

        if !key_repository::claim(&mut *tx, code, user_id, now).await? {
            return Err(AppError::conflict("This key has already been redeemed"));
        }

        let expires_at = match self.config.redeem_grant {
            RedeemGrantPolicy::Flat => Duration::try_hours(self.config.redeem_grant_hours)
                .and_then(|d| now.checked_add_signed(d)),
            RedeemGrantPolicy::KeyDuration => days_after(now, key.duration_days),
        }
        .ok_or_else(|| AppError::invalid_input("This key grants an invalid duration"))?;

        let entitlement =
            entitlement_repository::upsert_grant(&mut *tx, user_id, display_name, expires_at, now)
                .await?;
        session_repository::insert_session(
            &mut *tx,
            user_id,
            &SessionSource::RedeemedKey(code.to_string()),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            user_id,
            code,
            expires_at = %entitlement.expires_at,
            "Key redeemed"
        );
        Ok(entitlement)
    }

    /// All keys in creation order with lazily derived status
    pub async fn list_all(&self) -> AppResult<Vec<Key>> {
        let now = Utc::now();
        let ttl = self.config.unused_key_ttl_days;
        let keys = KeyRepository::new(&self.pool).list_all().await?;
        Ok(keys.into_iter().map(|k| k.observed_at(now, ttl)).collect())
    }

    pub async fn get(&self, code: &str) -> AppResult<Option<Key>> {
        let now = Utc::now();
        let key = KeyRepository::new(&self.pool).get(code).await?;
        Ok(key.map(|k| k.observed_at(now, self.config.unused_key_ttl_days)))
    }

    /// Insert the demo keys that are missing. Returns how many were added.
    pub async fn seed_demo_keys(&self) -> AppResult<usize> {
        let repo = KeyRepository::new(&self.pool);
        let now = Utc::now();
        let mut added = 0;
        for code in DEMO_KEY_CODES {
            if repo
                .insert_if_absent(code, DEMO_KEY_DAYS, SYSTEM_ACTOR, now)
                .await?
            {
                added += 1;
            }
        }
        if added > 0 {
            info!(added, "Seeded demo keys");
        }
        Ok(added)
    }

    /// Code of the key the user most recently redeemed
    pub async fn key_for_user(&self, user_id: &str) -> AppResult<Option<String>> {
        Ok(KeyRepository::new(&self.pool)
            .latest_for_user(user_id)
            .await?)
    }

    pub async fn totals(&self) -> AppResult<(u64, u64)> {
        let repo = KeyRepository::new(&self.pool);
        Ok((repo.count_all().await?, repo.count_redeemed().await?))
    }
}
