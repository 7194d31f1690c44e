//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod retry;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}', expected YYYY-MM-DD"))
}

/// Host name up to the first dot
pub fn short_hostname() -> String {
    let full = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string());
    full.split('.').next().unwrap_or_default().to_string()
}

/// Base name of the running program
pub fn script_name() -> String {
    std::env::args()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

/// `user@host` sender address for outgoing mail
pub fn default_sender() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "onduty".to_string());
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string());
    format!("{user}@{host}")
}

/// Mask a secret for logging, keeping the first four characters
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::from("<unset>");
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}***")
}
