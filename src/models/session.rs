//! API key and session models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issued API key record (the plaintext is never stored)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    /// First characters of the plaintext, for display
    pub key_prefix: String,
    /// User the key was issued to
    pub user_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Returned once, on creation
#[derive(Debug, Clone, Serialize)]
pub struct IssuedApiKey {
    #[serde(flatten)]
    pub api_key: ApiKey,
    /// Plaintext API key
    pub key: String,
}

/// How a session was opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum SessionSource {
    ApiKey(Uuid),
    RedeemedKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub source: SessionSource,
    pub logged_in_at: DateTime<Utc>,
}

/// Outcome of revoking a user's API access
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RevokeSummary {
    pub api_keys_removed: u64,
    pub session_removed: bool,
}
