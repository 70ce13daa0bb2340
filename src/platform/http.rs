//! REST client for the chat platform API

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{Attachment, ChatPlatform};
use crate::config::PlatformConfig;
use crate::models::RoleRef;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RoleResponse {
    id: String,
    name: String,
}

impl From<RoleResponse> for RoleRef {
    fn from(role: RoleResponse) -> Self {
        RoleRef {
            id: role.id,
            name: role.name,
        }
    }
}

/// Bot-token authenticated client for one guild
pub struct HttpPlatformClient {
    client: Client,
    base_url: String,
    bot_token: String,
    guild_id: String,
}

impl HttpPlatformClient {
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        info!("Initializing chat platform client for {}", config.api_base_url);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("keygate/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build platform HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            guild_id: config.guild_id.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "Platform request");
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bot {}", self.bot_token))
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::platform(format!(
                "Request failed with status {}: {}",
                status,
                truncate(&body, 300)
            )))
        }
    }

    async fn handle_empty(response: reqwest::Response) -> AppResult<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::platform(format!(
                "Request failed with status {}: {}",
                status,
                truncate(&body, 300)
            )))
        }
    }

    async fn open_dm_channel(&self, user_id: &str) -> AppResult<String> {
        let response = self
            .request(Method::POST, "/users/@me/channels")
            .json(&json!({ "recipient_id": user_id }))
            .send()
            .await?;
        let channel: IdResponse = Self::handle_response(response).await?;
        Ok(channel.id)
    }
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait]
impl ChatPlatform for HttpPlatformClient {
    async fn send_message(&self, channel_id: &str, content: &str) -> AppResult<String> {
        let response = self
            .request(Method::POST, &format!("/channels/{}/messages", channel_id))
            .json(&json!({ "content": content }))
            .send()
            .await?;
        let message: IdResponse = Self::handle_response(response).await?;
        Ok(message.id)
    }

    async fn send_direct_message(
        &self,
        user_id: &str,
        content: &str,
        attachment: Option<Attachment>,
    ) -> AppResult<()> {
        let channel_id = self.open_dm_channel(user_id).await?;
        let request = self.request(Method::POST, &format!("/channels/{}/messages", channel_id));

        let request = match attachment {
            None => request.json(&json!({ "content": content })),
            Some(file) => {
                let payload = json!({
                    "content": content,
                    "attachments": [{ "id": 0, "filename": file.filename }],
                });
                let part = Part::bytes(file.bytes)
                    .file_name(file.filename)
                    .mime_str("text/plain")?;
                request.multipart(
                    Form::new()
                        .text("payload_json", payload.to_string())
                        .part("files[0]", part),
                )
            }
        };

        let response = request.send().await?;
        let _: IdResponse = Self::handle_response(response).await?;
        Ok(())
    }

    async fn assign_role(&self, user_id: &str, role_id: &str) -> AppResult<()> {
        let response = self
            .request(
                Method::PUT,
                &format!(
                    "/guilds/{}/members/{}/roles/{}",
                    self.guild_id, user_id, role_id
                ),
            )
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<RoleRef>> {
        let response = self
            .request(Method::GET, &format!("/guilds/{}/roles", self.guild_id))
            .send()
            .await?;
        let roles: Vec<RoleResponse> = Self::handle_response(response).await?;
        Ok(roles
            .into_iter()
            .find(|r| r.name == name)
            .map(RoleRef::from))
    }

    async fn create_role(&self, name: &str) -> AppResult<RoleRef> {
        let response = self
            .request(Method::POST, &format!("/guilds/{}/roles", self.guild_id))
            .json(&json!({ "name": name, "mentionable": false }))
            .send()
            .await?;
        let role: RoleResponse = Self::handle_response(response).await?;
        info!(role_id = %role.id, name, "Role created");
        Ok(role.into())
    }
}
