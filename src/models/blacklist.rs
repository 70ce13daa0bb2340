//! Blacklist models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::days_after;

/// How long a blacklist entry lasts.
///
/// Encodes "permanent XOR unblacklist_at" in the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "until", rename_all = "snake_case")]
pub enum BlacklistTerm {
    Permanent,
    Until(DateTime<Utc>),
}

impl BlacklistTerm {
    /// `days == 0` means permanent; negative or out-of-range days give `None`
    pub fn from_days(days: i64, now: DateTime<Utc>) -> Option<Self> {
        match days {
            0 => Some(BlacklistTerm::Permanent),
            d => days_after(now, d).map(BlacklistTerm::Until),
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, BlacklistTerm::Permanent)
    }

    pub fn unblacklist_at(&self) -> Option<DateTime<Utc>> {
        match self {
            BlacklistTerm::Permanent => None,
            BlacklistTerm::Until(at) => Some(*at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub user_id: String,
    pub display_name: String,
    pub reason: String,
    pub term: BlacklistTerm,
    pub created_at: DateTime<Utc>,
}

impl BlacklistEntry {
    /// Permanent entries always apply; timed ones lapse at `unblacklist_at`
    pub fn is_in_effect_at(&self, now: DateTime<Utc>) -> bool {
        match self.term {
            BlacklistTerm::Permanent => true,
            BlacklistTerm::Until(at) => at > now,
        }
    }
}
