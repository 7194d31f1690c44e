//! Reminder notifications
//!
//! Sends on-call reminders to the person on duty through every configured
//! channel. Delivery failures are collected and reported; they never abort
//! the caller.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │      NotificationManager                   │
//! │  - Reminder composition (templates)        │
//! │  - Channel routing                         │
//! │  - Failure collection                      │
//! └────────────────────────────────────────────┘
//!                     │
//!         ┌───────────┼───────────┐
//!         ▼           ▼           ▼
//!   ┌─────────┐ ┌─────────┐ ┌─────────┐
//!   │  Email  │ │  Slack  │ │ Webhook │
//!   │ Channel │ │ Channel │ │ Channel │
//!   └─────────┘ └─────────┘ └─────────┘
//! ```
//!
//! # Urgencies
//!
//! - `today` / `tomorrow` - regular reminders sent by `notify`
//! - `emergency` - today's assignee changed during generation
//!
//! # Example
//!
//! ```rust,ignore
//! use onduty::notifications::{NotificationManager, Urgency};
//! use onduty::notifications::channels::webhook::{WebhookChannel, WebhookConfig};
//!
//! let mut manager = NotificationManager::new()?;
//! let webhook = WebhookConfig::new("https://hooks.example.com/oncall");
//! manager.add_channel(Box::new(WebhookChannel::new(webhook)?));
//!
//! let report = manager.notify(&assignee, Urgency::Tomorrow, today).await;
//! for failure in &report.failures {
//!     eprintln!("{failure}");
//! }
//! ```

pub mod channels;
mod manager;
pub mod templates;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::scheduler::roster::Person;

// Re-exports
pub use channels::{Channel, DeliveryStatus, NotifyError, NotifyResult};
pub use manager::{NotificationManager, NotificationReport};
pub use templates::ReminderTemplates;

/// How soon the duty starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// On duty today
    Today,
    /// On duty tomorrow
    Tomorrow,
    /// Moved up to today on short notice
    Emergency,
}

impl Urgency {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::Emergency => "emergency",
        }
    }

    /// Word used in messages ("today" or "tomorrow")
    pub fn when(&self) -> &'static str {
        match self {
            Self::Tomorrow => "tomorrow",
            Self::Today | Self::Emergency => "today",
        }
    }

    /// Days between "today" and the duty date
    pub fn day_offset(&self) -> u64 {
        match self {
            Self::Tomorrow => 1,
            Self::Today | Self::Emergency => 0,
        }
    }

    /// Check if this is an emergency
    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::Emergency)
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "tomorrow" => Ok(Self::Tomorrow),
            "emergency" => Ok(Self::Emergency),
            other => Err(format!("unknown urgency '{other}'")),
        }
    }
}

/// A rendered reminder for one person
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    /// Recipient
    pub person: Person,

    /// Urgency
    pub urgency: Urgency,

    /// Duty date
    pub date: NaiveDate,

    /// Mail subject
    pub subject: String,

    /// Mail body
    pub body: String,

    /// Short chat message
    pub chat: String,
}

impl Reminder {
    /// Recipient code
    pub fn code(&self) -> &str {
        &self.person.code
    }
}
