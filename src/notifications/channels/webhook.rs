//! Webhook reminder channel
//!
//! Posts each reminder as a JSON document to one endpoint, for chat bridges
//! or paging gateways that have no dedicated channel here.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{Channel, DeliveryStatus, NotifyError, NotifyResult};
use crate::notifications::Reminder;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// `[webhook]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Endpoint receiving the POST
    pub url: String,
    /// Sent as a bearer token when set
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Retries after the first attempt
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

impl WebhookConfig {
    /// Endpoint with default timeout and retries
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }

    /// Authenticate with a bearer token
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Check the endpoint and timeout
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.url).map_err(|e| format!("invalid url '{}': {e}", self.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("url must be http or https, got {}", url.scheme()));
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Reminder delivery over HTTP POST
///
/// 5xx, 429 and connection failures are retried with backoff; other 4xx
/// responses fail at once.
///
/// ```json
/// {
///   "code": "ab",
///   "urgency": "tomorrow",
///   "date": "2024-01-16",
///   "subject": "Reminder: You are on duty tomorrow [Tue 16 Jan]",
///   "body": "Dear ab, ...",
///   "text": "Hello ab! ..."
/// }
/// ```
pub struct WebhookChannel {
    config: WebhookConfig,
    client: Client,
    retry: RetryConfig,
}

impl WebhookChannel {
    pub fn new(config: WebhookConfig) -> NotifyResult<Self> {
        config.validate().map_err(NotifyError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Other(format!("Failed to create HTTP client: {e}")))?;

        let retry = RetryConfig::new(config.max_retries);
        Ok(Self {
            config,
            client,
            retry,
        })
    }

    /// Override the backoff schedule
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// JSON document posted for a reminder
    pub fn build_payload(&self, reminder: &Reminder) -> serde_json::Value {
        serde_json::json!({
            "code": reminder.code(),
            "urgency": reminder.urgency.as_str(),
            "date": reminder.date.format("%Y-%m-%d").to_string(),
            "subject": reminder.subject,
            "body": reminder.body,
            "text": reminder.chat,
        })
    }

    async fn post_once(&self, payload: &serde_json::Value) -> NotifyResult<()> {
        let mut request = self.client.post(&self.config.url).json(payload);
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!(url = %self.config.url, status = %status, "Webhook accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Status {
            channel: "webhook".to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, reminder: &Reminder) -> NotifyResult<DeliveryStatus> {
        let payload = self.build_payload(reminder);

        if let Err(e) =
            with_retry_if(&self.retry, || self.post_once(&payload), NotifyError::is_retryable).await
        {
            tracing::error!(
                url = %self.config.url,
                code = %reminder.code(),
                error = %e,
                "Webhook delivery failed"
            );
            return Err(e);
        }

        tracing::info!(channel = "webhook", code = %reminder.code(), "Reminder delivered");
        Ok(DeliveryStatus::success_with_message(
            "webhook",
            format!("Delivered to {}", self.config.url),
        ))
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name(),
            "url": self.config.url,
            "timeout_secs": self.config.timeout_secs,
            "max_retries": self.config.max_retries,
            "has_auth": self.config.auth_token.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{ReminderTemplates, Urgency};
    use crate::scheduler::roster::Person;
    use chrono::NaiveDate;

    #[test]
    fn test_config_validation() {
        assert!(WebhookConfig::new("https://example.com/oncall").validate().is_ok());
        assert!(WebhookConfig::new("").validate().is_err());
        assert!(WebhookConfig::new("example.com/oncall").validate().is_err());
        assert!(WebhookConfig::new("ftp://example.com/oncall").validate().is_err());

        let mut config = WebhookConfig::new("https://example.com/oncall");
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_url_rejected_by_channel() {
        let err = WebhookChannel::new(WebhookConfig::new("not-a-url")).err().unwrap();
        assert!(matches!(err, NotifyError::InvalidConfig(_)));
    }

    #[test]
    fn test_payload_for_tomorrow() {
        let channel = WebhookChannel::new(WebhookConfig::new("https://example.com/oncall")).unwrap();
        assert_eq!(channel.name(), "webhook");
        assert_eq!(channel.url(), "https://example.com/oncall");

        let reminder = ReminderTemplates::new()
            .unwrap()
            .render(
                &Person::new(0, "ab"),
                Urgency::Tomorrow,
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            )
            .unwrap();
        let payload = channel.build_payload(&reminder);

        assert_eq!(payload["code"], "ab");
        assert_eq!(payload["urgency"], "tomorrow");
        assert_eq!(payload["date"], "2024-01-16");
        assert_eq!(payload["subject"], "Reminder: You are on duty tomorrow [Tue 16 Jan]");
    }

    #[test]
    fn test_config_from_toml_defaults() {
        let config: WebhookConfig = toml::from_str(
            r#"
            url = "https://example.com/oncall"
            auth_token = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
    }
}
