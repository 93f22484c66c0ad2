//! Discord REST boundary.
//!
//! [`ChatPlatform`] covers the bot-token calls the jobs need and
//! [`OAuthProvider`] the user-facing login flow. [`DiscordClient`] implements
//! both over `reqwest`; tests substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use db::models::user::DiscordIdentity;
use util::config;

/// Guild text channel.
pub const TEXT_CHANNEL: u8 = 0;
/// Discord's maximum page size for channel messages.
pub const MAX_MESSAGES_PER_PAGE: u8 = 100;

const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;
const CDN_BASE: &str = "https://cdn.discordapp.com";
const AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";
pub const OAUTH_SCOPES: &str = "identify email guilds.members.read";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub author: DiscordUser,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl DiscordUser {
    /// Custom avatar on the CDN, if the user set one.
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_ref()
            .map(|hash| format!("{CDN_BASE}/avatars/{}/{hash}.png", self.id))
    }

    /// Custom avatar, or the stock avatar Discord would show.
    pub fn avatar_url_or_default(&self) -> String {
        self.avatar_url().unwrap_or_else(|| {
            let index = self
                .discriminator
                .as_deref()
                .and_then(|d| d.parse::<u64>().ok())
                .filter(|d| *d != 0)
                .map(|d| d % 5)
                .unwrap_or_else(|| (self.id.parse::<u64>().unwrap_or(0) >> 22) % 6);
            format!("{CDN_BASE}/embed/avatars/{index}.png")
        })
    }

    pub fn display_name(&self) -> &str {
        self.global_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }

    pub fn identity(&self) -> DiscordIdentity {
        DiscordIdentity {
            discord_id: self.id.clone(),
            username: self.username.clone(),
            discriminator: self.discriminator.clone(),
            global_name: self.global_name.clone(),
            avatar_url: Some(self.avatar_url_or_default()),
            email: self.email.clone(),
        }
    }
}

/// Creation time encoded in a snowflake id.
pub fn snowflake_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let raw: u64 = id.parse().ok()?;
    let ms = (raw >> 22) as i64 + DISCORD_EPOCH_MS;
    Utc.timestamp_millis_opt(ms).single()
}

#[derive(Debug, Error)]
pub enum ChatError {
    /// 404: the channel or user no longer exists.
    #[error("Discord resource not found: {0}")]
    NotFound(String),

    /// 403: the bot lost access; treated like a vanished channel.
    #[error("Discord denied access to {0}")]
    Forbidden(String),

    #[error("Discord returned {status} for {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    #[error("Discord request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Discord integration is not configured: {0}")]
    NotConfigured(&'static str),
}

impl ChatError {
    /// Whether the remote resource is gone for good (deleted or hidden from the bot).
    pub fn is_gone(&self) -> bool {
        matches!(self, ChatError::NotFound(_) | ChatError::Forbidden(_))
    }
}

/// Bot-authenticated reads used by the reconciliation jobs and admin tools.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn list_guild_channels(&self, guild_id: &str) -> Result<Vec<Channel>, ChatError>;

    async fn get_channel(&self, channel_id: &str) -> Result<Channel, ChatError>;

    /// Up to `limit` messages, only those newer than `after` when given.
    async fn list_channel_messages(
        &self,
        channel_id: &str,
        after: Option<&str>,
        limit: u8,
    ) -> Result<Vec<Message>, ChatError>;

    async fn get_user(&self, user_id: &str) -> Result<DiscordUser, ChatError>;
}

/// OAuth2 authorization-code flow for dashboard logins.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn authorize_url(&self, state: &str) -> Result<String, ChatError>;

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ChatError>;

    async fn current_user(&self, access_token: &str) -> Result<DiscordUser, ChatError>;
}

#[derive(Debug, Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl DiscordClient {
    pub fn new(api_base: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
        }
    }

    pub fn with_oauth(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self.redirect_uri = redirect_uri.into();
        self
    }

    /// Client wired from `DISCORD_*` settings; the OAuth callback lives at
    /// `{SITE_URL}/api/auth/callback`.
    pub fn from_config() -> Self {
        Self::new(config::discord_api_base(), config::discord_bot_token()).with_oauth(
            config::discord_client_id(),
            config::discord_client_secret(),
            format!("{}/api/auth/callback", config::site_url()),
        )
    }

    fn bot_auth(&self) -> Result<String, ChatError> {
        if self.bot_token.is_empty() {
            return Err(ChatError::NotConfigured("DISCORD_BOT_TOKEN"));
        }
        Ok(format!("Bot {}", self.bot_token))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        authorization: String,
    ) -> Result<T, ChatError> {
        let response = self
            .http
            .get(format!("{}{}", self.api_base, path))
            .header(reqwest::header::AUTHORIZATION, authorization)
            .query(query)
            .send()
            .await?;

        Self::decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T, ChatError> {
        match response.status() {
            StatusCode::NOT_FOUND => Err(ChatError::NotFound(path.to_string())),
            StatusCode::FORBIDDEN => Err(ChatError::Forbidden(path.to_string())),
            status if !status.is_success() => Err(ChatError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                body: response.text().await.unwrap_or_default(),
            }),
            _ => Ok(response.json::<T>().await?),
        }
    }
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn list_guild_channels(&self, guild_id: &str) -> Result<Vec<Channel>, ChatError> {
        let auth = self.bot_auth()?;
        self.get_json(&format!("/guilds/{guild_id}/channels"), &[], auth).await
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Channel, ChatError> {
        let auth = self.bot_auth()?;
        self.get_json(&format!("/channels/{channel_id}"), &[], auth).await
    }

    async fn list_channel_messages(
        &self,
        channel_id: &str,
        after: Option<&str>,
        limit: u8,
    ) -> Result<Vec<Message>, ChatError> {
        let auth = self.bot_auth()?;
        let mut query = vec![("limit", limit.min(MAX_MESSAGES_PER_PAGE).to_string())];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }
        self.get_json(&format!("/channels/{channel_id}/messages"), &query, auth)
            .await
    }

    async fn get_user(&self, user_id: &str) -> Result<DiscordUser, ChatError> {
        let auth = self.bot_auth()?;
        self.get_json(&format!("/users/{user_id}"), &[], auth).await
    }
}

#[async_trait]
impl OAuthProvider for DiscordClient {
    fn authorize_url(&self, state: &str) -> Result<String, ChatError> {
        if self.client_id.is_empty() {
            return Err(ChatError::NotConfigured("DISCORD_CLIENT_ID"));
        }

        let url = Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", OAUTH_SCOPES),
                ("state", state),
            ],
        )
        .map_err(|_| ChatError::NotConfigured("DISCORD_CLIENT_ID"))?;

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ChatError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(ChatError::NotConfigured("DISCORD_CLIENT_SECRET"));
        }

        let path = "/oauth2/token";
        let response = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        Self::decode(path, response).await
    }

    async fn current_user(&self, access_token: &str) -> Result<DiscordUser, ChatError> {
        self.get_json("/users/@me", &[], format!("Bearer {access_token}"))
            .await
    }
}
