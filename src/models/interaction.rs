//! Interaction models
//!
//! Inbound events as relayed from the chat platform, and the plain-text
//! replies sent back. Field names follow the relay's JSON.

use serde::{Deserialize, Serialize};

/// Custom id of the redeem modal
pub const REDEEM_MODAL_ID: &str = "redeem_key_modal";

/// Field id of the key input inside the redeem modal
pub const REDEEM_KEY_FIELD: &str = "key_input";

/// A role held by the actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: String,
    pub name: String,
}

/// The identity that triggered an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub roles: Vec<RoleRef>,
}

impl Actor {
    pub fn has_role_id(&self, role_id: &str) -> bool {
        self.roles.iter().any(|r| r.id == role_id)
    }

    pub fn has_role_named(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }
}

/// A user named as a command argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerAction {
    Add,
    Remove,
}

fn default_reason() -> String {
    "No reason provided".to_string()
}

/// Slash commands. `days` left out falls back to the deployment default
/// (blacklist: permanent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args", rename_all = "kebab-case")]
pub enum Command {
    #[serde(rename = "generateapi")]
    GenerateApi { user: UserRef },
    Login { apikey: String },
    #[serde(rename = "setpanel")]
    SetPanel {
        channel: String,
        script: String,
        buyer_role: String,
        manager_role: String,
    },
    Whitelist {
        user: UserRef,
        #[serde(default)]
        days: Option<i64>,
    },
    Blacklist {
        user: UserRef,
        #[serde(default)]
        days: i64,
        #[serde(default = "default_reason")]
        reason: String,
    },
    #[serde(rename = "unblacklist")]
    Unblacklist { user: UserRef },
    #[serde(rename = "force-resethwid")]
    ForceResetHwid { user: UserRef },
    #[serde(rename = "createkey")]
    CreateKey {
        code: String,
        #[serde(default)]
        days: Option<i64>,
    },
    #[serde(rename = "genkeys")]
    GenKeys {
        user: UserRef,
        amount: i64,
        #[serde(default)]
        days: Option<i64>,
    },
    #[serde(rename = "listkeys")]
    ListKeys,
    #[serde(rename = "revokeapi")]
    RevokeApi { user: UserRef },
    Panel,
    Status,
    #[serde(rename = "ownerwl")]
    OwnerWl { user: UserRef, action: OwnerAction },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::GenerateApi { .. } => "generateapi",
            Command::Login { .. } => "login",
            Command::SetPanel { .. } => "setpanel",
            Command::Whitelist { .. } => "whitelist",
            Command::Blacklist { .. } => "blacklist",
            Command::Unblacklist { .. } => "unblacklist",
            Command::ForceResetHwid { .. } => "force-resethwid",
            Command::CreateKey { .. } => "createkey",
            Command::GenKeys { .. } => "genkeys",
            Command::ListKeys => "listkeys",
            Command::RevokeApi { .. } => "revokeapi",
            Command::Panel => "panel",
            Command::Status => "status",
            Command::OwnerWl { .. } => "ownerwl",
        }
    }
}

/// Panel buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentId {
    GetScript,
    ResetHwid,
    GetRole,
    RedeemKey,
    GetStats,
    CheckStatus,
}

impl ComponentId {
    /// Buttons that need a session and an active entitlement. Stats only
    /// need a session so a blacklisted user can still read the reason.
    pub fn requires_whitelist(&self) -> bool {
        !matches!(self, ComponentId::RedeemKey | ComponentId::GetStats)
    }

    pub fn requires_login(&self) -> bool {
        !matches!(self, ComponentId::RedeemKey)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    Command {
        command: Command,
    },
    Component {
        custom_id: ComponentId,
    },
    ModalSubmit {
        custom_id: String,
        #[serde(default)]
        values: std::collections::HashMap<String, String>,
    },
}

/// One inbound event from the platform relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub actor: Actor,
    /// Server name used in notification text
    #[serde(default)]
    pub guild_name: Option<String>,
    pub interaction: Interaction,
}

/// Result of the notification step that follows a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryReport {
    Delivered,
    Failed { reason: String },
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryReport::Delivered)
    }
}

/// Modal the platform should open in response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalPrompt {
    pub custom_id: String,
    pub title: String,
    pub field_id: String,
    pub label: String,
    pub placeholder: String,
}

impl ModalPrompt {
    pub fn redeem_key() -> Self {
        Self {
            custom_id: REDEEM_MODAL_ID.to_string(),
            title: "Redeem Key".to_string(),
            field_id: REDEEM_KEY_FIELD.to_string(),
            label: "Enter your key".to_string(),
            placeholder: "KEY-XXXX-XXXX".to_string(),
        }
    }
}

/// Response to an interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    /// Only the actor sees it
    pub ephemeral: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modal: Option<ModalPrompt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryReport>,
}

impl Reply {
    pub fn private(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
            modal: None,
            delivery: None,
        }
    }

    pub fn public(content: impl Into<String>) -> Self {
        Self {
            ephemeral: false,
            ..Self::private(content)
        }
    }

    pub fn modal(prompt: ModalPrompt) -> Self {
        Self {
            modal: Some(prompt),
            ..Self::private(String::new())
        }
    }

    pub fn with_delivery(mut self, delivery: DeliveryReport) -> Self {
        self.delivery = Some(delivery);
        self
    }
}
