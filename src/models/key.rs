//! Access key models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Largest batch `generate_batch` will produce
pub const MAX_BATCH_SIZE: i64 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Unused,
    Redeemed,
    Expired,
}

impl KeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::Unused => "unused",
            KeyStatus::Redeemed => "redeemed",
            KeyStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unused" => Some(KeyStatus::Unused),
            "redeemed" => Some(KeyStatus::Redeemed),
            "expired" => Some(KeyStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A redeemable access key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub code: String,
    pub duration_days: i64,
    pub status: KeyStatus,
    pub created_by: String,
    pub redeemed_by: Option<String>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Key {
    /// Status as observed at `now`.
    ///
    /// `redeemed` and a stored `expired` are terminal. An unused key turns
    /// `expired` once it is older than `unused_ttl_days`, if a TTL is set.
    pub fn status_at(&self, now: DateTime<Utc>, unused_ttl_days: Option<i64>) -> KeyStatus {
        match (self.status, unused_ttl_days) {
            (KeyStatus::Unused, Some(ttl))
                if Duration::try_days(ttl)
                    .and_then(|d| self.created_at.checked_add_signed(d))
                    .is_some_and(|end| end <= now) =>
            {
                KeyStatus::Expired
            }
            (status, _) => status,
        }
    }

    /// Copy with the lazily derived status applied
    pub fn observed_at(mut self, now: DateTime<Utc>, unused_ttl_days: Option<i64>) -> Self {
        self.status = self.status_at(now, unused_ttl_days);
        self
    }
}

/// Clamp a requested batch size to `[.., MAX_BATCH_SIZE]`; `None` below one
pub fn clamp_batch_size(requested: i64) -> Option<usize> {
    if requested < 1 {
        None
    } else {
        Some(requested.min(MAX_BATCH_SIZE) as usize)
    }
}
