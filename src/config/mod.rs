//! Configuration management for onduty
//!
//! This module loads the TOML configuration file, applies environment
//! overrides for secrets and validates the result.
//!
//! ```toml
//! generate_days = 30
//! max_days_per_month = 8
//! max_weekends_per_month = 2
//!
//! [calendar]
//! backend = "google"
//! oncall_calendar = "team-oncall@group.calendar.google.com"
//! token_file = "/etc/onduty/token.json"
//!
//! [[oncallers]]
//! order = 0
//! code = "ab"
//! email = "ab@example.com"
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::calendar::markers::{TitleMarkers, DEFAULT_AWAY_WORDS, DEFAULT_FIXED_WORD};
use crate::calendar::opsgenie::OpsgenieSettings;
use crate::holidays::{HolidayCalendar, HolidayRegion};
use crate::notifications::channels::email::EmailConfig;
use crate::notifications::channels::slack::SlackConfig;
use crate::notifications::channels::webhook::WebhookConfig;
use crate::scheduler::ledger::RestrictionLimits;
use crate::scheduler::roster::{Person, Roster, DEFAULT_SHADOW_CODE};

/// Environment variable overriding the Google access token
pub const ENV_GOOGLE_TOKEN: &str = "ONDUTY_GOOGLE_TOKEN";
/// Environment variable overriding the Slack token
pub const ENV_SLACK_TOKEN: &str = "ONDUTY_SLACK_TOKEN";
/// Environment variable overriding the Opsgenie key
pub const ENV_OPSGENIE_KEY: &str = "ONDUTY_OPSGENIE_KEY";
/// Environment variable overriding the mail relay
pub const ENV_MAIL_SERVER: &str = "ONDUTY_MAIL_SERVER";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Days to plan per run
    #[serde(default = "default_generate_days")]
    pub generate_days: u32,

    /// Monthly day limit per person (0 = unlimited)
    #[serde(default)]
    pub max_days_per_month: u32,

    /// Monthly weekend-day limit per person (0 = unlimited)
    #[serde(default)]
    pub max_weekends_per_month: u32,

    /// Code recorded when nobody is available
    #[serde(default = "default_shadow")]
    pub shadow_oncaller: String,

    /// Title words marking an absence
    #[serde(default = "default_away_words")]
    pub away_words: Vec<String>,

    /// Title word pinning a duty entry
    #[serde(default = "default_fixed_word")]
    pub fixed_word: String,

    /// Calendar backend
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Business-day rules
    #[serde(default)]
    pub holidays: HolidaysConfig,

    /// Reminder mail
    #[serde(default)]
    pub mail: MailConfig,

    /// Slack direct messages
    #[serde(default)]
    pub slack: Option<SlackConfig>,

    /// Generic webhook
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,

    /// Opsgenie override mirroring
    #[serde(default)]
    pub opsgenie: Option<OpsgenieSettings>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Rotation members
    #[serde(default)]
    pub oncallers: Vec<Person>,
}

/// Calendar backend kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarBackend {
    /// Google Calendar REST API
    #[default]
    Google,
    /// JSON file
    Local,
}

/// Calendar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Backend kind
    #[serde(default)]
    pub backend: CalendarBackend,

    /// Calendar holding the duty entries
    #[serde(default)]
    pub oncall_calendar: String,

    /// Calendar holding absence entries (defaults to the on-call calendar)
    #[serde(default)]
    pub availability_calendar: Option<String>,

    /// JSON file with an `access_token`
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Access token, normally from the environment
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// API root override
    #[serde(default)]
    pub api_base: Option<String>,

    /// File used by the local backend
    #[serde(default = "default_local_file")]
    pub local_file: PathBuf,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Holiday configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HolidaysConfig {
    /// Public holiday region
    #[serde(default)]
    pub region: HolidayRegion,

    /// Additional non-business days
    #[serde(default)]
    pub extra: Vec<NaiveDate>,
}

/// Mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Send reminder mails
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Relay settings
    #[serde(flatten)]
    pub smtp: EmailConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_generate_days() -> u32 {
    30
}

fn default_shadow() -> String {
    DEFAULT_SHADOW_CODE.to_string()
}

fn default_away_words() -> Vec<String> {
    DEFAULT_AWAY_WORDS.split('|').map(str::to_string).collect()
}

fn default_fixed_word() -> String {
    DEFAULT_FIXED_WORD.to_string()
}

fn default_local_file() -> PathBuf {
    PathBuf::from("onduty-calendar.json")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_log_format() -> String {
    String::from("pretty")
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            backend: CalendarBackend::default(),
            oncall_calendar: String::new(),
            availability_calendar: None,
            token_file: None,
            token: None,
            api_base: None,
            local_file: default_local_file(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smtp: EmailConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generate_days: default_generate_days(),
            max_days_per_month: 0,
            max_weekends_per_month: 0,
            shadow_oncaller: default_shadow(),
            away_words: default_away_words(),
            fixed_word: default_fixed_word(),
            calendar: CalendarConfig::default(),
            holidays: HolidaysConfig::default(),
            mail: MailConfig::default(),
            slack: None,
            webhook: None,
            opsgenie: None,
            logging: LoggingConfig::default(),
            oncallers: Vec::new(),
        }
    }
}

impl Config {
    /// Load, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override secrets from the environment
    pub fn apply_env(&mut self) {
        if let Some(token) = env_value(ENV_GOOGLE_TOKEN) {
            self.calendar.token = Some(token);
        }

        if let Some(token) = env_value(ENV_SLACK_TOKEN) {
            match &mut self.slack {
                Some(slack) => slack.token = token,
                None => self.slack = Some(SlackConfig::new(token)),
            }
        }

        if let Some(key) = env_value(ENV_OPSGENIE_KEY) {
            match &mut self.opsgenie {
                Some(opsgenie) => opsgenie.api_key = key,
                None => tracing::warn!("{ENV_OPSGENIE_KEY} is set but no [opsgenie] section exists"),
            }
        }

        if let Some(server) = env_value(ENV_MAIL_SERVER) {
            self.mail.smtp.server = server;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.generate_days == 0 {
            anyhow::bail!("generate_days must be greater than 0");
        }

        if self.calendar.timeout_secs == 0 {
            anyhow::bail!("calendar.timeout_secs must be greater than 0");
        }

        if self.calendar.backend == CalendarBackend::Google && self.calendar.oncall_calendar.is_empty()
        {
            anyhow::bail!("calendar.oncall_calendar is required for the google backend");
        }

        if self.away_words.iter().all(|w| w.trim().is_empty()) {
            anyhow::bail!("away_words cannot be empty");
        }

        if let Some(opsgenie) = &self.opsgenie {
            if opsgenie.api_key.trim().is_empty() {
                anyhow::bail!("opsgenie.api_key is required when [opsgenie] is configured");
            }
            if opsgenie.schedule_id.trim().is_empty() {
                anyhow::bail!("opsgenie.schedule_id is required when [opsgenie] is configured");
            }
        }

        if let Some(webhook) = &self.webhook {
            webhook
                .validate()
                .map_err(|e| anyhow::anyhow!("webhook: {e}"))?;
        }

        self.markers()?;
        self.roster()?;
        Ok(())
    }

    /// Build the roster from `[[oncallers]]`
    pub fn roster(&self) -> Result<Roster> {
        Roster::new(self.oncallers.clone(), self.shadow_oncaller.as_str())
            .context("Invalid [[oncallers]] configuration")
    }

    /// Title markers for duty and absence entries
    pub fn markers(&self) -> Result<TitleMarkers> {
        let words: Vec<&str> = self
            .away_words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .collect();
        TitleMarkers::new(&words.join("|"), &self.fixed_word)
            .context("Invalid away_words or fixed_word")
    }

    /// Monthly restriction limits
    #[must_use]
    pub fn limits(&self) -> RestrictionLimits {
        RestrictionLimits::new(self.max_days_per_month, self.max_weekends_per_month)
    }

    /// Business-day oracle
    #[must_use]
    pub fn holiday_calendar(&self) -> HolidayCalendar {
        HolidayCalendar::new(self.holidays.region).with_extra(self.holidays.extra.iter().copied())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.calendar.timeout_secs)
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
