//! Panel configuration models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Placeholder replaced with the user's key in script templates
pub const KEY_PLACEHOLDER: &str = "{{KEY}}";

/// Substituted when the user never redeemed a key
pub const NO_KEY_ASSIGNED: &str = "NO-KEY-ASSIGNED";

/// Singleton deployment panel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelConfig {
    pub channel_id: String,
    pub script_template: String,
    pub buyer_role_id: String,
    pub manager_role_id: String,
    pub panel_message_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Request to replace the panel configuration
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetPanelRequest {
    #[validate(length(min = 1, max = 64))]
    pub channel_id: String,
    #[validate(length(min = 1, max = 8000))]
    pub script_template: String,
    #[validate(length(min = 1, max = 64))]
    pub buyer_role_id: String,
    #[validate(length(min = 1, max = 64))]
    pub manager_role_id: String,
}

/// Replace every placeholder in `template` with `key`
pub fn render_script(template: &str, key: &str) -> String {
    template.replace(KEY_PLACEHOLDER, key)
}
