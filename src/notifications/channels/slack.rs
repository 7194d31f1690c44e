//! Slack direct-message channel
//!
//! Looks the person up in `users.list` by their Slack id or handle, opens
//! an IM with `conversations.open` and posts the chat text with
//! `chat.postMessage`. Emergency reminders are also posted to the
//! configured team channel.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Channel, DeliveryStatus, NotifyError, NotifyResult};
use crate::notifications::Reminder;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Slack Web API root
pub const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// Display name used for posted messages
pub const BOT_USERNAME: &str = "rotator";

/// Icon used for posted messages
pub const BOT_ICON: &str = ":umbrella:";

/// Slack channel configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token
    #[serde(default)]
    pub token: String,
    /// Team channel for emergency announcements
    #[serde(default)]
    pub channel: Option<String>,
    /// API root, overridable for tests
    #[serde(default)]
    pub api_base: Option<String>,
}

impl SlackConfig {
    /// Create a configuration with a token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    /// Set the team channel
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Set the API root
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct UsersList {
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct Member {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct ConversationOpen {
    channel: ConversationId,
}

#[derive(Debug, Deserialize)]
struct ConversationId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Posted {}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    username: &'a str,
    icon_emoji: &'a str,
}

// ============================================================================
// Channel
// ============================================================================

/// Slack notification channel
pub struct SlackChannel {
    config: SlackConfig,
    client: Client,
    api_base: String,
    retry: RetryConfig,
}

impl SlackChannel {
    /// Create a new Slack channel
    pub fn new(config: SlackConfig) -> NotifyResult<Self> {
        if config.token.trim().is_empty() {
            return Err(NotifyError::InvalidConfig("Slack token cannot be empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Other(format!("Failed to create HTTP client: {e}")))?;

        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            config,
            client,
            api_base,
            retry: RetryConfig::new(2),
        })
    }

    /// Override the backoff schedule
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base)
    }

    async fn decode<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> NotifyResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                channel: "slack".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<T> = response.json().await?;
        if !envelope.ok {
            let error = envelope.error.unwrap_or_else(|| "unknown_error".to_string());
            if error == "ratelimited" {
                return Err(NotifyError::RateLimited(method.to_string()));
            }
            return Err(NotifyError::api("slack", format!("{method}: {error}")));
        }
        envelope
            .data
            .ok_or_else(|| NotifyError::api("slack", format!("{method}: empty response")))
    }

    async fn users_page(&self, cursor: &str) -> NotifyResult<UsersList> {
        let mut request = self
            .client
            .get(self.url("users.list"))
            .bearer_auth(&self.config.token)
            .query(&[("limit", "200")]);
        if !cursor.is_empty() {
            request = request.query(&[("cursor", cursor)]);
        }
        Self::decode("users.list", request.send().await?).await
    }

    /// Resolve a Slack id or handle to a user id
    pub async fn find_user(&self, slack_id: &str) -> NotifyResult<Option<String>> {
        let mut cursor = String::new();
        loop {
            let page = with_retry_if(
                &self.retry,
                || self.users_page(&cursor),
                NotifyError::is_retryable,
            )
            .await?;

            if let Some(member) = page
                .members
                .iter()
                .find(|m| m.id == slack_id || m.name.eq_ignore_ascii_case(slack_id))
            {
                return Ok(Some(member.id.clone()));
            }

            cursor = page
                .response_metadata
                .map(|meta| meta.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                return Ok(None);
            }
        }
    }

    async fn open_im(&self, user_id: &str) -> NotifyResult<String> {
        let response = self
            .client
            .post(self.url("conversations.open"))
            .bearer_auth(&self.config.token)
            .json(&serde_json::json!({ "users": user_id }))
            .send()
            .await?;
        let opened: ConversationOpen = Self::decode("conversations.open", response).await?;
        Ok(opened.channel.id)
    }

    async fn post_once(&self, channel: &str, text: &str) -> NotifyResult<()> {
        let response = self
            .client
            .post(self.url("chat.postMessage"))
            .bearer_auth(&self.config.token)
            .json(&PostMessage {
                channel,
                text,
                username: BOT_USERNAME,
                icon_emoji: BOT_ICON,
            })
            .send()
            .await?;
        Self::decode::<Posted>("chat.postMessage", response).await?;
        Ok(())
    }

    /// Post a message to a channel or IM
    pub async fn post(&self, channel: &str, text: &str) -> NotifyResult<()> {
        with_retry_if(&self.retry, || self.post_once(channel, text), NotifyError::is_retryable).await
    }
}

#[async_trait]
impl Channel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, reminder: &Reminder) -> NotifyResult<DeliveryStatus> {
        let slack_id = reminder.person.slack_id.trim();
        if slack_id.is_empty() {
            return Ok(DeliveryStatus::skipped(
                "slack",
                format!("no Slack id for {}", reminder.code()),
            ));
        }

        let Some(user_id) = self.find_user(slack_id).await? else {
            tracing::debug!(slack_id = %slack_id, "Slack user not found");
            return Ok(DeliveryStatus::skipped(
                "slack",
                format!("user {slack_id} not found"),
            ));
        };

        let im = self.open_im(&user_id).await?;
        self.post(&im, &reminder.chat).await?;

        if reminder.urgency.is_emergency() {
            if let Some(channel) = self.config.channel.as_deref().filter(|c| !c.is_empty()) {
                self.post(channel, &reminder.chat).await?;
            }
        }

        tracing::info!(channel = "slack", code = %reminder.code(), "Reminder delivered");
        Ok(DeliveryStatus::success_with_message(
            "slack",
            format!("Sent to {slack_id}"),
        ))
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name(),
            "api_base": self.api_base,
            "channel": self.config.channel,
        })
    }
}
