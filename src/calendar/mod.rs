//! Calendar collaborators
//!
//! The rotation engine reads and writes the schedule through the
//! [`ScheduleStore`] trait and reads absences through [`AbsenceSource`].
//! Backends:
//!
//! - [`google`] - Google Calendar v3 REST API
//! - [`local`] - JSON file or in-memory calendar
//! - [`DryRun`] - wrapper that logs commits instead of writing
//! - [`opsgenie`] - wrapper that mirrors commits as Opsgenie overrides
//!
//! Event titles are interpreted by [`markers::TitleMarkers`].

pub mod google;
pub mod local;
pub mod markers;
pub mod opsgenie;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::scheduler::ledger::{MonthKey, RestrictionCounter};
use crate::scheduler::roster::Assignee;
use crate::scheduler::workday::is_weekend;

pub use google::GoogleCalendar;
pub use local::LocalCalendar;
pub use markers::TitleMarkers;
pub use opsgenie::{Mirrored, OpsgenieMirror};

/// Per-code counters for one month, as read from a store
pub type MonthCounts = HashMap<String, RestrictionCounter>;

/// Result type for collaborator calls
pub type TransportResult<T> = Result<T, TransportError>;

// ============================================================================
// Errors
// ============================================================================

/// Failures talking to a calendar or schedule backend
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} returned status {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend misconfigured: {0}")]
    Config(String),
}

impl TransportError {
    /// Create a status error
    pub fn status(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    /// Network-level and server-side failures may succeed on a later run
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// ============================================================================
// Entries
// ============================================================================

/// Duty entry recorded for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyEntry {
    /// Lower-case oncaller code
    pub code: String,

    /// Pinned by hand; the generator must keep it
    #[serde(default)]
    pub fixed: bool,
}

impl DutyEntry {
    /// Create a non-fixed entry
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into().to_lowercase(),
            fixed: false,
        }
    }

    /// Create a fixed entry
    pub fn fixed(code: impl Into<String>) -> Self {
        Self {
            code: code.into().to_lowercase(),
            fixed: true,
        }
    }
}

/// What a commit did to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitStatus {
    /// The backend already held the same assignee
    Unchanged,
    /// An existing entry was rewritten
    Updated,
    /// A new entry was created
    Created,
    /// Nothing was written (dry run)
    Skipped,
}

impl CommitStatus {
    /// Check if the backend was modified
    pub fn wrote(&self) -> bool {
        matches!(self, Self::Updated | Self::Created)
    }
}

impl fmt::Display for CommitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unchanged => "unchanged",
            Self::Updated => "updated",
            Self::Created => "created",
            Self::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

/// Count one duty per date, adding weekend dates to the weekend counter
///
/// When a date carries several entries only the first one counts.
pub fn count_month<I, S>(entries: I) -> MonthCounts
where
    I: IntoIterator<Item = (NaiveDate, S)>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut counts = MonthCounts::new();
    for (date, code) in entries {
        if !seen.insert(date) {
            continue;
        }
        counts
            .entry(code.as_ref().to_lowercase())
            .or_default()
            .increment(is_weekend(date));
    }
    counts
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Source and sink of duty entries
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Duty entry for a date, if any
    async fn fetch_day(&self, date: NaiveDate) -> TransportResult<Option<DutyEntry>>;

    /// Booked days and weekend days per code for a month
    async fn fetch_month_counts(&self, month: MonthKey) -> TransportResult<MonthCounts>;

    /// Materialize an assignment
    ///
    /// Idempotent: committing the assignee already recorded for the date
    /// returns [`CommitStatus::Unchanged`].
    async fn commit_day(
        &self,
        date: NaiveDate,
        assignee: &Assignee,
        displaced: Option<&Assignee>,
    ) -> TransportResult<CommitStatus>;
}

/// Source of absence markers
#[async_trait]
pub trait AbsenceSource: Send + Sync {
    /// Lower-case codes marked absent on a date
    async fn absence_codes_for(&self, date: NaiveDate) -> TransportResult<Vec<String>>;
}

// ============================================================================
// Dry Run
// ============================================================================

/// Store wrapper that reads through and skips every commit
#[derive(Debug, Clone)]
pub struct DryRun<S> {
    inner: S,
}

impl<S> DryRun<S> {
    /// Wrap a store
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ScheduleStore> ScheduleStore for DryRun<S> {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn fetch_day(&self, date: NaiveDate) -> TransportResult<Option<DutyEntry>> {
        self.inner.fetch_day(date).await
    }

    async fn fetch_month_counts(&self, month: MonthKey) -> TransportResult<MonthCounts> {
        self.inner.fetch_month_counts(month).await
    }

    async fn commit_day(
        &self,
        date: NaiveDate,
        assignee: &Assignee,
        displaced: Option<&Assignee>,
    ) -> TransportResult<CommitStatus> {
        tracing::info!(
            date = %date,
            code = %assignee,
            displaced = displaced.map(|d| d.code()).unwrap_or("-"),
            store = self.inner.name(),
            "Dry run, not committing"
        );
        Ok(CommitStatus::Skipped)
    }
}

#[async_trait]
impl<S: AbsenceSource> AbsenceSource for DryRun<S> {
    async fn absence_codes_for(&self, date: NaiveDate) -> TransportResult<Vec<String>> {
        self.inner.absence_codes_for(date).await
    }
}

#[async_trait]
impl<T: ScheduleStore + ?Sized> ScheduleStore for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch_day(&self, date: NaiveDate) -> TransportResult<Option<DutyEntry>> {
        (**self).fetch_day(date).await
    }

    async fn fetch_month_counts(&self, month: MonthKey) -> TransportResult<MonthCounts> {
        (**self).fetch_month_counts(month).await
    }

    async fn commit_day(
        &self,
        date: NaiveDate,
        assignee: &Assignee,
        displaced: Option<&Assignee>,
    ) -> TransportResult<CommitStatus> {
        (**self).commit_day(date, assignee, displaced).await
    }
}

#[async_trait]
impl<T: ScheduleStore + ?Sized> ScheduleStore for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch_day(&self, date: NaiveDate) -> TransportResult<Option<DutyEntry>> {
        (**self).fetch_day(date).await
    }

    async fn fetch_month_counts(&self, month: MonthKey) -> TransportResult<MonthCounts> {
        (**self).fetch_month_counts(month).await
    }

    async fn commit_day(
        &self,
        date: NaiveDate,
        assignee: &Assignee,
        displaced: Option<&Assignee>,
    ) -> TransportResult<CommitStatus> {
        (**self).commit_day(date, assignee, displaced).await
    }
}

#[async_trait]
impl<T: AbsenceSource + ?Sized> AbsenceSource for Arc<T> {
    async fn absence_codes_for(&self, date: NaiveDate) -> TransportResult<Vec<String>> {
        (**self).absence_codes_for(date).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_count_month_counts_weekends() {
        // 2024-01-13 and 14 are Saturday and Sunday
        let counts = count_month(vec![
            (date(12), "ab"),
            (date(13), "AB"),
            (date(14), "cd"),
            (date(15), "cd"),
        ]);

        assert_eq!(counts["ab"], RestrictionCounter::new(2, 1));
        assert_eq!(counts["cd"], RestrictionCounter::new(2, 1));
    }

    #[test]
    fn test_count_month_one_entry_per_date() {
        let counts = count_month(vec![(date(15), "ab"), (date(15), "cd")]);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts["ab"].days_booked, 1);
    }

    #[test]
    fn test_duty_entry_lowercases() {
        assert_eq!(DutyEntry::fixed("AB").code, "ab");
        assert!(DutyEntry::fixed("AB").fixed);
        assert!(!DutyEntry::new("ab").fixed);
    }

    #[test]
    fn test_status_retryable() {
        assert!(TransportError::status("list", 503, "").is_retryable());
        assert!(!TransportError::status("list", 404, "").is_retryable());
        assert!(!TransportError::Decode("x".into()).is_retryable());
    }

    #[test]
    fn test_commit_status_wrote() {
        assert!(CommitStatus::Created.wrote());
        assert!(CommitStatus::Updated.wrote());
        assert!(!CommitStatus::Unchanged.wrote());
        assert!(!CommitStatus::Skipped.wrote());
    }
}
