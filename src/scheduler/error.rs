//! Error types for the scheduler module

use chrono::NaiveDate;
use thiserror::Error;

use crate::calendar::TransportError;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The configured roster cannot be used for rotation
    #[error("Invalid roster: {reason}")]
    InvalidRoster { reason: String },

    /// A code was given that is neither on the roster nor the shadow code
    #[error("Unknown oncaller code '{code}'. Valid options: {}", valid_options.join(", "))]
    UnknownOncaller {
        code: String,
        valid_options: Vec<String>,
    },

    /// Attempt to overwrite a pinned day
    #[error("Day {date} is fixed and cannot be reassigned")]
    FixedDay { date: NaiveDate },

    /// The requested generation window is unusable
    #[error("Invalid generation window: {reason}")]
    InvalidWindow { reason: String },

    /// A collaborator call failed while processing a day
    #[error("Transport failure during '{operation}' for {date}: {source}")]
    Transport {
        date: NaiveDate,
        operation: &'static str,
        #[source]
        source: TransportError,
    },
}

impl SchedulerError {
    /// Create an invalid roster error
    pub fn invalid_roster(reason: impl Into<String>) -> Self {
        Self::InvalidRoster {
            reason: reason.into(),
        }
    }

    /// Create an unknown oncaller error
    pub fn unknown_oncaller(code: impl Into<String>, valid_options: Vec<String>) -> Self {
        Self::UnknownOncaller {
            code: code.into(),
            valid_options,
        }
    }

    /// Create an invalid window error
    pub fn invalid_window(reason: impl Into<String>) -> Self {
        Self::InvalidWindow {
            reason: reason.into(),
        }
    }

    /// Wrap a transport failure with the day and operation it happened on
    pub fn transport(date: NaiveDate, operation: &'static str, source: TransportError) -> Self {
        Self::Transport {
            date,
            operation,
            source,
        }
    }

    /// Configuration problems are detected before any day is generated
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidRoster { .. } | Self::UnknownOncaller { .. } | Self::InvalidWindow { .. }
        )
    }
}
