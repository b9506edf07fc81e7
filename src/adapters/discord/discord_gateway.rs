//! Discord access gateway.
//!
//! # Endpoints
//!
//! - `GET    /guilds/{g}/members/{u}` - member roles (404 = not a member)
//! - `PUT    /guilds/{g}/members/{u}/roles/{r}` - grant role
//! - `DELETE /guilds/{g}/members/{u}/roles/{r}` - revoke role
//! - `GET    /channels/{c}` - permission overwrites (channel visibility)
//! - `PUT    /channels/{c}/permissions/{u}` - member overwrite allowing view + history
//! - `DELETE /channels/{c}/permissions/{u}` - drop member overwrite
//! - `GET    /users/@me` - identity probe used for readiness

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ChannelId, ChatUserId, RoleId};
use crate::ports::{AccessGateway, GatewayError, MemberSnapshot};

const VIEW_CHANNEL: u64 = 1 << 10;
const READ_MESSAGE_HISTORY: u64 = 1 << 16;

/// Overwrite target type for a single member.
const OVERWRITE_TYPE_MEMBER: u8 = 1;

/// Discord API configuration.
#[derive(Clone)]
pub struct DiscordConfig {
    bot_token: SecretString,
    guild_id: String,
    api_base_url: String,
    timeout: Duration,
}

impl DiscordConfig {
    pub fn new(bot_token: SecretString, guild_id: impl Into<String>) -> Self {
        Self {
            bot_token,
            guild_id: guild_id.into(),
            api_base_url: "https://discord.com/api/v10".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct GuildMember {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    permission_overwrites: Vec<PermissionOverwrite>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PermissionOverwrite {
    #[serde(default, skip_serializing)]
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    allow: String,
    deny: String,
}

impl PermissionOverwrite {
    fn member_view_grant() -> Self {
        Self {
            id: String::new(),
            kind: OVERWRITE_TYPE_MEMBER,
            allow: (VIEW_CHANNEL | READ_MESSAGE_HISTORY).to_string(),
            deny: "0".to_string(),
        }
    }

    fn allows_view_for(&self, user: &ChatUserId) -> bool {
        self.kind == OVERWRITE_TYPE_MEMBER
            && self.id == user.as_str()
            && self.allow.parse::<u64>().map(|bits| bits & VIEW_CHANNEL != 0).unwrap_or(false)
    }
}

/// Discord adapter implementing `AccessGateway`.
pub struct DiscordAccessGateway {
    config: DiscordConfig,
    http_client: reqwest::Client,
    ready: AtomicBool,
}

impl DiscordAccessGateway {
    pub fn new(config: DiscordConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
            ready: AtomicBool::new(false),
        })
    }

    /// Verifies the bot token with an identity probe and marks the gateway ready.
    pub async fn connect(&self) -> Result<(), GatewayError> {
        let response = self.send(self.request(reqwest::Method::GET, "/users/@me")).await?;
        check_status(response.status(), "identity probe")?;
        self.ready.store(true, Ordering::SeqCst);
        tracing::info!(guild_id = %self.config.guild_id, "Discord gateway ready");
        Ok(())
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.api_base_url, path);
        self.http_client.request(method, url).header(
            reqwest::header::AUTHORIZATION,
            format!("Bot {}", self.config.bot_token.expose_secret()),
        )
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, GatewayError> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(self.config.timeout)
            } else {
                GatewayError::Unavailable(e.to_string())
            }
        })
    }

    /// Issues a mutation; 404 counts as success when `missing_ok`.
    async fn mutate(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
        missing_ok: bool,
    ) -> Result<(), GatewayError> {
        let response = self.send(request).await?;
        let status = response.status();
        if missing_ok && status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(status_error(status, action, message))
    }

    async fn member_can_view(
        &self,
        user: &ChatUserId,
        channel: &ChannelId,
    ) -> Result<bool, GatewayError> {
        let path = format!("/channels/{}", channel);
        let response = self.send(self.request(reqwest::Method::GET, &path)).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(channel_id = %channel, "Channel not found");
            return Ok(false);
        }
        check_status(response.status(), "get channel")?;

        let channel: Channel = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("Failed to parse channel: {}", e)))?;
        Ok(channel
            .permission_overwrites
            .iter()
            .any(|overwrite| overwrite.allows_view_for(user)))
    }

    fn member_path(&self, user: &ChatUserId) -> String {
        format!("/guilds/{}/members/{}", self.config.guild_id, user)
    }

    fn role_path(&self, user: &ChatUserId, role: &RoleId) -> String {
        format!("/guilds/{}/members/{}/roles/{}", self.config.guild_id, user, role)
    }
}

fn check_status(status: reqwest::StatusCode, action: &str) -> Result<(), GatewayError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(status_error(status, action, String::new()))
    }
}

fn status_error(status: reqwest::StatusCode, action: &str, message: String) -> GatewayError {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        GatewayError::Unavailable(format!("Discord {} returned {}", action, status))
    } else {
        GatewayError::Rejected {
            status: status.as_u16(),
            message: if message.is_empty() {
                format!("Discord {} failed", action)
            } else {
                message
            },
        }
    }
}

#[async_trait]
impl AccessGateway for DiscordAccessGateway {
    async fn get_member(
        &self,
        user: &ChatUserId,
        channels: &[ChannelId],
    ) -> Result<Option<MemberSnapshot>, GatewayError> {
        let response = self
            .send(self.request(reqwest::Method::GET, &self.member_path(user)))
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(response.status(), "get member")?;

        let member: GuildMember = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("Failed to parse member: {}", e)))?;
        let roles = member
            .roles
            .into_iter()
            .filter_map(|role| RoleId::new(role).ok())
            .collect();

        let mut visible_channels = HashSet::new();
        for channel in channels {
            if self.member_can_view(user, channel).await? {
                visible_channels.insert(channel.clone());
            }
        }

        Ok(Some(MemberSnapshot {
            roles,
            visible_channels,
        }))
    }

    async fn grant_role(&self, user: &ChatUserId, role: &RoleId) -> Result<(), GatewayError> {
        let request = self.request(reqwest::Method::PUT, &self.role_path(user, role));
        self.mutate(request, "grant role", false).await
    }

    async fn revoke_role(&self, user: &ChatUserId, role: &RoleId) -> Result<(), GatewayError> {
        let request = self.request(reqwest::Method::DELETE, &self.role_path(user, role));
        self.mutate(request, "revoke role", true).await
    }

    async fn grant_channel_view(
        &self,
        user: &ChatUserId,
        channel: &ChannelId,
    ) -> Result<(), GatewayError> {
        let path = format!("/channels/{}/permissions/{}", channel, user);
        let request = self
            .request(reqwest::Method::PUT, &path)
            .json(&PermissionOverwrite::member_view_grant());
        self.mutate(request, "grant channel view", false).await
    }

    async fn revoke_channel_view(
        &self,
        user: &ChatUserId,
        channel: &ChannelId,
    ) -> Result<(), GatewayError> {
        let path = format!("/channels/{}/permissions/{}", channel, user);
        let request = self.request(reqwest::Method::DELETE, &path);
        self.mutate(request, "revoke channel view", true).await
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
