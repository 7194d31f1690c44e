//! Notification channels for delivering reminders
//!
//! This module provides the channels reminders are sent through: SMTP
//! email, Slack direct messages and generic webhooks.

pub mod email;
pub mod slack;
pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::notifications::Reminder;

/// Result type for channel operations
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors that can occur during channel operations
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid channel configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The remote API rejected the call
    #[error("{channel} API error: {message}")]
    Api { channel: String, message: String },

    /// Non-success HTTP status
    #[error("{channel} returned HTTP {status}: {body}")]
    Status {
        channel: String,
        status: u16,
        body: String,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Mail submission failed
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// Template rendering failed
    #[error("Template error: {0}")]
    Template(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error
    #[error("Channel error: {0}")]
    Other(String),
}

impl NotifyError {
    /// Create an API error
    pub fn api(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::RateLimited(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Response from sending a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// Whether the notification was successfully delivered
    pub success: bool,
    /// Channel that delivered (or failed to deliver) the notification
    pub channel: String,
    /// Optional message about the delivery
    pub message: Option<String>,
    /// Timestamp of delivery attempt
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl DeliveryStatus {
    /// Create a successful delivery status
    pub fn success(channel: impl Into<String>) -> Self {
        Self {
            success: true,
            channel: channel.into(),
            message: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create a successful delivery status with a message
    pub fn success_with_message(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            channel: channel.into(),
            message: Some(message.into()),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Nothing to deliver for this recipient
    pub fn skipped(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::success_with_message(channel, format!("skipped: {}", reason.into()))
    }

    /// Create a failed delivery status
    pub fn failure(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            channel: channel.into(),
            message: Some(message.into()),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "SUCCESS" } else { "FAILED" };
        write!(f, "[{status}] {}", self.channel)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// Trait for notification channels
///
/// `send` returns `Ok` with a skipped status when the recipient has no
/// address for this channel, and `Err` when delivery was attempted and
/// failed.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &str;

    /// Send a reminder through this channel
    async fn send(&self, reminder: &Reminder) -> NotifyResult<DeliveryStatus>;

    /// Get channel configuration as JSON
    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name(),
        })
    }
}
