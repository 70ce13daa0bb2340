//! Reply text helpers

use chrono::{DateTime, Utc};

use crate::config::{BotConfig, RedeemGrantPolicy};
use crate::models::{Key, KeyStatus, PanelConfig};

/// Number of keys shown by `/listkeys`
pub const LIST_KEYS_LIMIT: usize = 25;

pub const PANEL_MESSAGE: &str = "🎮 **Control Panel**\n\n\
Welcome! Use the buttons below to manage your access.\n\n\
📜 Get Script: receive your script loader via DM\n\
🔄 Reset HWID: reset your hardware ID\n\
🎭 Get Role: claim your buyer role\n\
🔑 Redeem Key: redeem a key for access\n\
📊 Get Stats: view your statistics\n\
ℹ️ Check Status: check your whitelist status\n\n\
Make sure you are logged in before using the panel.";

/// Relative timestamp markup understood by the platform client
pub fn relative(ts: DateTime<Utc>) -> String {
    format!("<t:{}:R>", ts.timestamp())
}

pub fn user_mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

pub fn role_mention(role_id: &str) -> String {
    format!("<@&{}>", role_id)
}

pub fn channel_mention(channel_id: &str) -> String {
    format!("<#{}>", channel_id)
}

/// Where users are sent after a whitelist or blacklist
pub fn panel_mention(panel: Option<&PanelConfig>) -> String {
    panel
        .map(|p| channel_mention(&p.channel_id))
        .unwrap_or_else(|| "panel".to_string())
}

pub fn active_label(active: bool) -> &'static str {
    if active {
        "✅ Active"
    } else {
        "❌ Inactive"
    }
}

pub fn hwid_label(hwid: Option<&str>) -> &str {
    hwid.unwrap_or("Not set")
}

/// `/listkeys` body: first page of keys plus a count footer
pub fn key_list(keys: &[Key]) -> String {
    let mut lines: Vec<String> = keys
        .iter()
        .take(LIST_KEYS_LIMIT)
        .map(|key| {
            let emoji = match key.status {
                KeyStatus::Redeemed => "✅",
                KeyStatus::Expired => "❌",
                KeyStatus::Unused => "⏳",
            };
            format!(
                "{} `{}` - {} ({}d)",
                emoji, key.code, key.status, key.duration_days
            )
        })
        .collect();

    lines.insert(0, "📋 **Keys List**\n".to_string());
    lines.push(format!(
        "\nShowing {} of {} keys",
        keys.len().min(LIST_KEYS_LIMIT),
        keys.len()
    ));
    lines.join("\n")
}

/// How long a redeemed key grants, in words
pub fn grant_window(config: &BotConfig, key_days: Option<i64>) -> String {
    match (config.redeem_grant, key_days) {
        (RedeemGrantPolicy::KeyDuration, Some(days)) => format!("{}-day", days),
        _ => format!("{}-hour", config.redeem_grant_hours),
    }
}
