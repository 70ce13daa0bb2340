//! Outbound chat platform effects
//!
//! Everything the bot core asks the platform to do after a mutation has been
//! committed: post messages, send DMs (optionally with a file), hand out
//! roles. Failures here are reported to the caller and never roll anything
//! back.

mod http;

pub use http::HttpPlatformClient;

use async_trait::async_trait;

use crate::models::RoleRef;
use crate::utils::{AppError, AppResult};

/// A file attached to a direct message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn text(filename: impl Into<String>, content: &str) -> Self {
        Self {
            filename: filename.into(),
            bytes: content.as_bytes().to_vec(),
        }
    }
}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Post to a channel; returns the new message id
    async fn send_message(&self, channel_id: &str, content: &str) -> AppResult<String>;

    async fn send_direct_message(
        &self,
        user_id: &str,
        content: &str,
        attachment: Option<Attachment>,
    ) -> AppResult<()>;

    async fn assign_role(&self, user_id: &str, role_id: &str) -> AppResult<()>;

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<RoleRef>>;

    async fn create_role(&self, name: &str) -> AppResult<RoleRef>;
}

/// Used when no platform is configured. Every call fails, which surfaces as
/// a failed delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPlatform;

impl DisabledPlatform {
    fn unavailable<T>() -> AppResult<T> {
        Err(AppError::platform("No chat platform is configured"))
    }
}

#[async_trait]
impl ChatPlatform for DisabledPlatform {
    async fn send_message(&self, _channel_id: &str, _content: &str) -> AppResult<String> {
        Self::unavailable()
    }

    async fn send_direct_message(
        &self,
        _user_id: &str,
        _content: &str,
        _attachment: Option<Attachment>,
    ) -> AppResult<()> {
        Self::unavailable()
    }

    async fn assign_role(&self, _user_id: &str, _role_id: &str) -> AppResult<()> {
        Self::unavailable()
    }

    async fn find_role_by_name(&self, _name: &str) -> AppResult<Option<RoleRef>> {
        Self::unavailable()
    }

    async fn create_role(&self, _name: &str) -> AppResult<RoleRef> {
        Self::unavailable()
    }
}
