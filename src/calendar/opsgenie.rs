//! Opsgenie schedule override mirror
//!
//! Every committed day is mirrored as a schedule override aliased with the
//! date (`YYYYMMDD`). Weekdays start at 08:00 local time on the weekday
//! rotation; weekends start at 10:00 on the weekend rotation. Overrides end
//! at midnight of the following day.

use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Weekday};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    AbsenceSource, CommitStatus, DutyEntry, MonthCounts, ScheduleStore, TransportError,
    TransportResult,
};
use crate::scheduler::ledger::MonthKey;
use crate::scheduler::roster::Assignee;

/// Public schedules endpoint
pub const DEFAULT_API_BASE: &str = "https://api.opsgenie.com/v2/schedules";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideUser {
    #[serde(rename = "type")]
    pub kind: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRotation {
    pub name: String,
}

/// Schedule override payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOverride {
    pub alias: String,
    pub user: OverrideUser,
    pub start_date: String,
    pub end_date: String,
    pub rotations: Vec<OverrideRotation>,
}

// ============================================================================
// Mirror
// ============================================================================

/// Opsgenie connection settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpsgenieSettings {
    pub api_key: String,
    pub schedule_id: String,
    pub weekday_schedule: String,
    pub weekend_schedule: String,
    #[serde(default)]
    pub api_base: Option<String>,
}

/// Writes schedule overrides
#[derive(Debug, Clone)]
pub struct OpsgenieMirror {
    client: Client,
    settings: OpsgenieSettings,
    api_base: String,
}

impl OpsgenieMirror {
    /// Create a mirror
    pub fn new(settings: OpsgenieSettings, timeout: Duration) -> TransportResult<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(TransportError::Auth("opsgenie api_key is empty".into()));
        }
        if settings.schedule_id.trim().is_empty() {
            return Err(TransportError::Config("opsgenie schedule_id is empty".into()));
        }

        let client = Client::builder().timeout(timeout).build()?;
        let api_base = settings
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            settings,
            api_base,
        })
    }

    fn overrides_url(&self) -> String {
        format!("{}/{}/overrides", self.api_base, self.settings.schedule_id)
    }

    fn override_url(&self, alias: &str) -> String {
        format!("{}/{}", self.overrides_url(), alias)
    }

    fn auth(&self) -> String {
        format!("GenieKey {}", self.settings.api_key)
    }

    /// Build the override for a date
    pub fn build_override(&self, date: NaiveDate, username: &str) -> TransportResult<ScheduleOverride> {
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        let (hour, rotation) = if weekend {
            (10, &self.settings.weekend_schedule)
        } else {
            (8, &self.settings.weekday_schedule)
        };

        let start = date
            .and_hms_opt(hour, 0, 0)
            .ok_or_else(|| TransportError::Config(format!("invalid date {date}")))?;
        let end = date
            .succ_opt()
            .and_then(|next| next.and_hms_opt(0, 0, 0))
            .ok_or_else(|| TransportError::Config(format!("no day after {date}")))?;

        Ok(ScheduleOverride {
            alias: date.format("%Y%m%d").to_string(),
            user: OverrideUser {
                kind: "user".to_string(),
                username: username.to_string(),
            },
            start_date: local_timestamp(start)?,
            end_date: local_timestamp(end)?,
            rotations: vec![OverrideRotation {
                name: rotation.clone(),
            }],
        })
    }

    /// Check if an override with this alias exists
    pub async fn override_exists(&self, alias: &str) -> TransportResult<bool> {
        let response = self
            .client
            .get(self.override_url(alias))
            .header("Authorization", self.auth())
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(TransportError::status("opsgenie.get", status.as_u16(), body))
            }
        }
    }

    /// Create or replace the override for a date
    pub async fn set_override(&self, date: NaiveDate, username: &str) -> TransportResult<CommitStatus> {
        let payload = self.build_override(date, username)?;
        let exists = self.override_exists(&payload.alias).await?;

        let (operation, request, status) = if exists {
            (
                "opsgenie.update",
                self.client.put(self.override_url(&payload.alias)),
                CommitStatus::Updated,
            )
        } else {
            (
                "opsgenie.create",
                self.client.post(self.overrides_url()),
                CommitStatus::Created,
            )
        };

        let response = request
            .header("Authorization", self.auth())
            .json(&payload)
            .send()
            .await?;

        let code = response.status();
        if code != StatusCode::OK && code != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::status(operation, code.as_u16(), body));
        }

        tracing::debug!(
            alias = %payload.alias,
            rotation = %payload.rotations.first().map(|r| r.name.as_str()).unwrap_or(""),
            status = %status,
            "Mirrored override"
        );
        Ok(status)
    }
}

fn local_timestamp(naive: NaiveDateTime) -> TransportResult<String> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.format(TIME_FORMAT).to_string())
        .ok_or_else(|| TransportError::Config(format!("{naive} does not exist in local time")))
}

// ============================================================================
// Store Decorator
// ============================================================================

/// Store wrapper that mirrors every written day to Opsgenie
#[derive(Debug, Clone)]
pub struct Mirrored<S> {
    inner: S,
    mirror: OpsgenieMirror,
}

impl<S> Mirrored<S> {
    /// Wrap a store
    pub fn new(inner: S, mirror: OpsgenieMirror) -> Self {
        Self { inner, mirror }
    }
}

#[async_trait]
impl<S: ScheduleStore> ScheduleStore for Mirrored<S> {
    fn name(&self) -> &str {
        self.inner.name()
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
        let status = self.inner.commit_day(date, assignee, displaced).await?;
        if status == CommitStatus::Skipped {
            return Ok(status);
        }

        match assignee.person().filter(|p| !p.email.is_empty()) {
            Some(person) => {
                self.mirror.set_override(date, &person.email).await?;
            }
            None => {
                tracing::debug!(date = %date, code = %assignee, "No address to mirror");
            }
        }
        Ok(status)
    }
}

#[async_trait]
impl<S: AbsenceSource> AbsenceSource for Mirrored<S> {
    async fn absence_codes_for(&self, date: NaiveDate) -> TransportResult<Vec<String>> {
        self.inner.absence_codes_for(date).await
    }
}
