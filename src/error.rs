//! Unified error handling for the onduty crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`OndutyErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use onduty::error::{Error, OndutyErrorTrait};
//!
//! fn report(err: &Error) -> i32 {
//!     eprintln!("{}: {err}", err.category());
//!     err.category().exit_code()
//! }
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::calendar::TransportError;
pub use crate::monitoring::MonitoringError;
pub use crate::notifications::NotifyError;
pub use crate::scheduler::error::SchedulerError;

/// Common trait for all onduty error types
pub trait OndutyErrorTrait: std::error::Error {
    /// Check if this error is recoverable (a later run may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Calendar and HTTP backend errors
    Network,
    /// Reminder delivery errors
    Notification,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Scheduler errors
    Scheduler,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::Notification => "notification error",
            Self::Storage => "storage error",
            Self::Config => "configuration error",
            Self::Scheduler => "scheduler error",
            Self::Other => "error",
        }
    }

    /// Process exit code for this category
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type for the onduty crate
#[derive(Error, Debug)]
pub enum Error {
    /// Rotation errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Calendar and schedule backend errors
    #[error("Calendar error: {0}")]
    Transport(#[from] TransportError),

    /// Reminder delivery errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Status file errors
    #[error("Monitoring error: {0}")]
    Monitoring(#[from] MonitoringError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl OndutyErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Scheduler(SchedulerError::Transport { source, .. }) => source.is_retryable(),
            Self::Scheduler(_) => false,
            Self::Transport(e) => e.is_retryable(),
            Self::Notify(e) => e.is_retryable(),
            Self::Monitoring(MonitoringError::Io(_)) => true,
            Self::Monitoring(_) => false,
            Self::Io(_) => true,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Scheduler(e) if e.is_configuration() => ErrorCategory::Config,
            Self::Scheduler(SchedulerError::Transport { .. }) => ErrorCategory::Network,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
            Self::Transport(TransportError::Config(_)) => ErrorCategory::Config,
            Self::Transport(TransportError::Io(_)) => ErrorCategory::Storage,
            Self::Transport(_) => ErrorCategory::Network,
            Self::Notify(NotifyError::InvalidConfig(_)) => ErrorCategory::Config,
            Self::Notify(_) => ErrorCategory::Notification,
            Self::Monitoring(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Configuration loading reports through anyhow
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Config(format!("{err:#}"))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
