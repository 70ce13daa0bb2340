//! User entitlement models
//!
//! An entitlement is a user's time-bounded grant of access. Expiry is lazy:
//! nothing rewrites the stored status when `expires_at` passes, every read
//! goes through [`is_active_at`] instead.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::BlacklistEntry;

/// Stored entitlement flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementStatus {
    Active,
    Inactive,
}

impl EntitlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementStatus::Active => "active",
            EntitlementStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(EntitlementStatus::Active),
            "inactive" => Some(EntitlementStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub user_id: String,
    pub display_name: String,
    pub status: EntitlementStatus,
    pub expires_at: DateTime<Utc>,
    pub hwid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entitlement {
    /// Stored flag is active and the grant has not run out yet
    pub fn is_current_at(&self, now: DateTime<Utc>) -> bool {
        self.status == EntitlementStatus::Active && self.expires_at > now
    }
}

/// The single activity predicate.
///
/// Active iff an entitlement exists, its stored status is active, it expires
/// strictly after `now`, and no blacklist entry is in effect at `now`.
pub fn is_active_at(
    entitlement: Option<&Entitlement>,
    blacklist: Option<&BlacklistEntry>,
    now: DateTime<Utc>,
) -> bool {
    let current = entitlement.is_some_and(|e| e.is_current_at(now));
    let blacklisted = blacklist.is_some_and(|b| b.is_in_effect_at(now));
    current && !blacklisted
}

/// Longest span, in days, of any grant, blacklist or key
pub const MAX_DURATION_DAYS: i64 = 36_500;

/// `now + days`, or `None` when `days` is outside `1..=MAX_DURATION_DAYS`
pub fn days_after(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    if !(1..=MAX_DURATION_DAYS).contains(&days) {
        return None;
    }
    Duration::try_days(days).and_then(|d| now.checked_add_signed(d))
}

/// Per-user statistics shown on the panel
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub active: bool,
    pub hwid: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Present only while the entry is in effect
    pub blacklist: Option<BlacklistEntry>,
    pub total_active_users: u64,
    pub total_keys: u64,
    pub redeemed_keys: u64,
}
