//! Local calendar backend
//!
//! Keeps duty entries and absence codes per date in memory, optionally
//! backed by a JSON file that is rewritten after every change:
//!
//! ```json
//! {
//!   "duties": { "2024-01-15": { "code": "ab", "fixed": false } },
//!   "absences": { "2024-01-16": ["cd"] }
//! }
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use super::{
    count_month, AbsenceSource, CommitStatus, DutyEntry, MonthCounts, ScheduleStore,
    TransportResult,
};
use crate::scheduler::ledger::MonthKey;
use crate::scheduler::roster::Assignee;

/// Serialized calendar content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalCalendarData {
    #[serde(default)]
    pub duties: BTreeMap<NaiveDate, DutyEntry>,
    #[serde(default)]
    pub absences: BTreeMap<NaiveDate, Vec<String>>,
}

/// In-memory or JSON-file calendar
#[derive(Debug, Default)]
pub struct LocalCalendar {
    data: RwLock<LocalCalendarData>,
    path: Option<PathBuf>,
}

impl LocalCalendar {
    /// Create an empty in-memory calendar
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a calendar file; a missing file starts empty
    pub async fn open(path: impl AsRef<Path>) -> TransportResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&content)?
        } else {
            LocalCalendarData::default()
        };

        tracing::debug!(
            path = %path.display(),
            duties = data.duties.len(),
            "Loaded local calendar"
        );

        Ok(Self {
            data: RwLock::new(data),
            path: Some(path),
        })
    }

    /// Add a duty entry
    pub fn with_duty(mut self, date: NaiveDate, entry: DutyEntry) -> Self {
        self.data.get_mut().duties.insert(date, entry);
        self
    }

    /// Mark a code absent on a date
    pub fn with_absence(mut self, date: NaiveDate, code: impl Into<String>) -> Self {
        self.data
            .get_mut()
            .absences
            .entry(date)
            .or_default()
            .push(code.into().to_lowercase());
        self
    }

    /// Duty entry of a date
    pub async fn duty(&self, date: NaiveDate) -> Option<DutyEntry> {
        self.data.read().await.duties.get(&date).cloned()
    }

    /// Copy of the whole calendar
    pub async fn snapshot(&self) -> LocalCalendarData {
        self.data.read().await.clone()
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn save(&self, data: &LocalCalendarData) -> TransportResult<()> {
        if let Some(path) = &self.path {
            let json = serde_json::to_string_pretty(data)?;
            tokio::fs::write(path, json).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for LocalCalendar {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch_day(&self, date: NaiveDate) -> TransportResult<Option<DutyEntry>> {
        Ok(self.duty(date).await)
    }

    async fn fetch_month_counts(&self, month: MonthKey) -> TransportResult<MonthCounts> {
        let data = self.data.read().await;
        let entries = data
            .duties
            .iter()
            .filter(|(date, _)| month.contains(**date))
            .map(|(date, entry)| (*date, entry.code.as_str()));
        Ok(count_month(entries))
    }

    async fn commit_day(
        &self,
        date: NaiveDate,
        assignee: &Assignee,
        _displaced: Option<&Assignee>,
    ) -> TransportResult<CommitStatus> {
        let mut data = self.data.write().await;
        let status = match data.duties.get(&date) {
            Some(entry) if entry.code == assignee.code() => return Ok(CommitStatus::Unchanged),
            Some(_) => CommitStatus::Updated,
            None => CommitStatus::Created,
        };

        // Memory only changes once the file write went through.
        let mut staged = data.clone();
        staged.duties.insert(date, DutyEntry::new(assignee.code()));
        self.save(&staged).await?;
        *data = staged;
        Ok(status)
    }
}

#[async_trait]
impl AbsenceSource for LocalCalendar {
    async fn absence_codes_for(&self, date: NaiveDate) -> TransportResult<Vec<String>> {
        Ok(self
            .data
            .read()
            .await
            .absences
            .get(&date)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::TransportError;
    use crate::scheduler::roster::Person;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn ab() -> Assignee {
        Assignee::Oncaller(Person::new(0, "ab"))
    }

    #[tokio::test]
    async fn test_commit_statuses() {
        let calendar = LocalCalendar::new().with_duty(date(2), DutyEntry::new("cd"));

        assert_eq!(
            calendar.commit_day(date(1), &ab(), None).await.unwrap(),
            CommitStatus::Created
        );
        assert_eq!(
            calendar.commit_day(date(1), &ab(), None).await.unwrap(),
            CommitStatus::Unchanged
        );
        assert_eq!(
            calendar.commit_day(date(2), &ab(), None).await.unwrap(),
            CommitStatus::Updated
        );
        assert_eq!(calendar.duty(date(2)).await.unwrap().code, "ab");
    }

    #[tokio::test]
    async fn test_month_counts() {
        let calendar = LocalCalendar::new()
            .with_duty(date(13), DutyEntry::new("ab"))
            .with_duty(date(15), DutyEntry::new("ab"))
            .with_duty(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), DutyEntry::new("ab"));

        let counts = calendar
            .fetch_month_counts(MonthKey::new(2024, 1))
            .await
            .unwrap();
        assert_eq!(counts["ab"].days_booked, 2);
        assert_eq!(counts["ab"].weekends_booked, 1);
    }

    #[tokio::test]
    async fn test_absences() {
        let calendar = LocalCalendar::new().with_absence(date(3), "CD");

        assert_eq!(calendar.absence_codes_for(date(3)).await.unwrap(), vec!["cd"]);
        assert!(calendar.absence_codes_for(date(4)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.json");

        let calendar = LocalCalendar::open(&path).await.unwrap();
        calendar.commit_day(date(5), &ab(), None).await.unwrap();

        let reopened = LocalCalendar::open(&path).await.unwrap();
        assert_eq!(reopened.duty(date(5)).await, Some(DutyEntry::new("ab")));
    }

    #[tokio::test]
    async fn test_failed_save_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("calendar.json");

        let calendar = LocalCalendar::open(&path).await.unwrap();
        let err = calendar.commit_day(date(5), &ab(), None).await.unwrap_err();

        assert!(matches!(err, TransportError::Io(_)));
        assert_eq!(calendar.duty(date(5)).await, None);
        assert!(calendar.snapshot().await.duties.is_empty());
    }
}
