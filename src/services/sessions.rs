//! API keys and login sessions

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use crate::db::{DbPool, SessionRepository};
use crate::models::{IssuedApiKey, RevokeSummary, Session, SessionSource};
use crate::services::locks::UserLocks;
use crate::utils::validation::{validate_api_key, API_KEY_LENGTH};
use crate::utils::{AppError, AppResult};

const KEY_PREFIX_LEN: usize = 8;

/// Fresh 50-character alphanumeric API key
pub fn generate_api_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// Hex SHA-256 digest used as the lookup value for an API key
pub fn hash_api_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

pub struct SessionService {
    pool: DbPool,
    locks: UserLocks,
}

impl SessionService {
    pub fn new(pool: DbPool, locks: UserLocks) -> Self {
        Self { pool, locks }
    }

    /// Issue an API key to `holder_id`. The plaintext is returned once.
    pub async fn create_api_key(&self, created_by: &str, holder_id: &str) -> AppResult<IssuedApiKey> {
        let key = generate_api_key();
        let api_key = SessionRepository::new(&self.pool)
            .insert_api_key(
                Uuid::new_v4(),
                &hash_api_key(&key),
                &key[..KEY_PREFIX_LEN],
                holder_id,
                created_by,
                Utc::now(),
            )
            .await?;

        info!(
            api_key_id = %api_key.id,
            holder_id,
            created_by,
            "API key issued"
        );
        Ok(IssuedApiKey { api_key, key })
    }

    /// Open a session with an API key issued to `user_id`
    pub async fn login(
        &self,
        user_id: &str,
        display_name: &str,
        api_key: &str,
    ) -> AppResult<Session> {
        let api_key = api_key.trim();
        if !validate_api_key(api_key) {
            return Err(AppError::not_found("Invalid API key"));
        }

        let _guard = self.locks.lock(user_id).await;
        let repo = SessionRepository::new(&self.pool);

        let record = repo
            .find_api_key_by_hash(&hash_api_key(api_key))
            .await?
            .ok_or_else(|| AppError::not_found("Invalid API key"))?;
        if record.user_id != user_id {
            return Err(AppError::not_authorized(
                "This API key was issued to a different user",
            ));
        }
        if repo.get_session(user_id).await?.is_some() {
            return Err(AppError::conflict("You are already logged in"));
        }

        let session = repo
            .insert_session(user_id, &SessionSource::ApiKey(record.id), Utc::now())
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => AppError::conflict("You are already logged in"),
                other => other,
            })?;

        info!(user_id, display_name, api_key_id = %record.id, "User logged in");
        Ok(session)
    }

    pub async fn is_logged_in(&self, user_id: &str) -> AppResult<bool> {
        Ok(self.session(user_id).await?.is_some())
    }

    pub async fn session(&self, user_id: &str) -> AppResult<Option<Session>> {
        Ok(SessionRepository::new(&self.pool).get_session(user_id).await?)
    }

    /// Remove every API key issued to the user and close their session
    pub async fn revoke(&self, user_id: &str) -> AppResult<RevokeSummary> {
        let _guard = self.locks.lock(user_id).await;
        let repo = SessionRepository::new(&self.pool);

        let summary = RevokeSummary {
            api_keys_removed: repo.delete_api_keys_for_user(user_id).await?,
            session_removed: repo.delete_session(user_id).await?,
        };

        info!(
            user_id,
            api_keys_removed = summary.api_keys_removed,
            session_removed = summary.session_removed,
            "API access revoked"
        );
        Ok(summary)
    }
}
