//! Google Calendar backend
//!
//! Talks to the Calendar v3 REST API with a bearer token. Duty entries are
//! all-day events in the on-call calendar titled `"<code> onduty"`;
//! absences are all-day events in the availability calendar.
//!
//! Day lookups list the one-minute window starting one second after
//! midnight UTC, which only all-day events of that date overlap.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, SecondsFormat};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use super::{
    count_month, AbsenceSource, CommitStatus, DutyEntry, MonthCounts, ScheduleStore,
    TitleMarkers, TransportError, TransportResult,
};
use crate::scheduler::ledger::MonthKey;
use crate::scheduler::roster::Assignee;

/// Public Calendar v3 endpoint
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Attendee {
    email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end: Option<EventDateTime>,
    #[serde(default)]
    attendees: Vec<Attendee>,
}

impl Event {
    /// All-day events carry a date but no time
    fn is_all_day(&self) -> bool {
        self.start
            .as_ref()
            .map(|s| s.date_time.is_none())
            .unwrap_or(false)
    }

    fn start_date(&self) -> Option<NaiveDate> {
        self.start
            .as_ref()
            .and_then(|s| s.date.as_deref())
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventList {
    #[serde(default)]
    items: Vec<Event>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    access_token: String,
}

/// Read the `access_token` field of a JSON token file
pub fn read_token_file(path: impl AsRef<Path>) -> TransportResult<String> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let token: TokenFile = serde_json::from_str(&content)?;
    if token.access_token.trim().is_empty() {
        return Err(TransportError::Auth(format!(
            "empty access_token in {}",
            path.as_ref().display()
        )));
    }
    Ok(token.access_token)
}

// ============================================================================
// Client
// ============================================================================

/// Google Calendar schedule store and absence source
#[derive(Debug, Clone)]
pub struct GoogleCalendar {
    client: Client,
    api_base: String,
    token: String,
    oncall_calendar: String,
    availability_calendar: String,
    markers: TitleMarkers,
}

impl GoogleCalendar {
    /// Create a client for an on-call calendar
    ///
    /// The availability calendar defaults to the on-call calendar.
    pub fn new(
        token: impl Into<String>,
        oncall_calendar: impl Into<String>,
        timeout: Duration,
    ) -> TransportResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(TransportError::Auth("no access token configured".into()));
        }
        let oncall_calendar = oncall_calendar.into();
        if oncall_calendar.is_empty() {
            return Err(TransportError::Config("oncall calendar id is empty".into()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("onduty/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            token,
            availability_calendar: oncall_calendar.clone(),
            oncall_calendar,
            markers: TitleMarkers::default(),
        })
    }

    /// Use a different API endpoint
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Read absences from a separate calendar
    pub fn with_availability_calendar(mut self, calendar: impl Into<String>) -> Self {
        let calendar = calendar.into();
        if !calendar.is_empty() {
            self.availability_calendar = calendar;
        }
        self
    }

    /// Use custom title markers
    pub fn with_markers(mut self, markers: TitleMarkers) -> Self {
        self.markers = markers;
        self
    }

    fn events_url(&self, calendar: &str, event_id: Option<&str>) -> TransportResult<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| TransportError::Config(format!("invalid api_base: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| TransportError::Config("api_base cannot be a base URL".into()))?;
            segments.pop_if_empty().extend(["calendars", calendar, "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn check(operation: &str, response: Response) -> TransportResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::status(operation, status.as_u16(), body))
    }

    /// List events of a calendar between two dates, following pagination
    async fn list_events(
        &self,
        calendar: &str,
        time_min: String,
        time_max: String,
    ) -> TransportResult<Vec<Event>> {
        let url = self.events_url(calendar, None)?;
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("timeMin", time_min.clone()),
                ("timeMax", time_max.clone()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .client
                .get(url.clone())
                .bearer_auth(&self.token)
                .query(&query)
                .send()
                .await?;
            let page: EventList = Self::check("events.list", response).await?.json().await?;

            events.extend(page.items);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(events)
    }

    /// All-day events overlapping a date
    async fn day_events(&self, calendar: &str, date: NaiveDate) -> TransportResult<Vec<Event>> {
        let start = date
            .and_hms_opt(0, 0, 1)
            .ok_or_else(|| TransportError::Config(format!("invalid date {date}")))?
            .and_utc();
        let end = start + ChronoDuration::minutes(1);
        let events = self
            .list_events(
                calendar,
                start.to_rfc3339_opts(SecondsFormat::Secs, true),
                end.to_rfc3339_opts(SecondsFormat::Secs, true),
            )
            .await?;
        Ok(events.into_iter().filter(Event::is_all_day).collect())
    }

    /// First duty event of a date with its parsed code and fixed flag
    async fn duty_event(&self, date: NaiveDate) -> TransportResult<Option<(Event, String, bool)>> {
        let events = self.day_events(&self.oncall_calendar, date).await?;
        Ok(events.into_iter().find_map(|event| {
            self.markers
                .parse_duty(&event.summary)
                .map(|(code, fixed)| (event, code, fixed))
        }))
    }

    fn attendees(assignee: &Assignee) -> Vec<Attendee> {
        assignee
            .person()
            .filter(|p| p.has_calendar_email())
            .map(|p| {
                vec![Attendee {
                    email: p.calendar_email.clone(),
                }]
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ScheduleStore for GoogleCalendar {
    fn name(&self) -> &str {
        "google"
    }

    async fn fetch_day(&self, date: NaiveDate) -> TransportResult<Option<DutyEntry>> {
        Ok(self
            .duty_event(date)
            .await?
            .map(|(_, code, fixed)| DutyEntry { code, fixed }))
    }

    async fn fetch_month_counts(&self, month: MonthKey) -> TransportResult<MonthCounts> {
        let (Some(first), Some(next)) = (month.first_day(), month.next_first_day()) else {
            return Err(TransportError::Config(format!("invalid month {month}")));
        };
        let (Some(start), Some(end)) = (first.and_hms_opt(0, 0, 1), next.and_hms_opt(0, 0, 0))
        else {
            return Err(TransportError::Config(format!("invalid month {month}")));
        };

        let events = self
            .list_events(
                &self.oncall_calendar,
                start.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true),
                end.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true),
            )
            .await?;

        let entries = events
            .iter()
            .filter(|e| e.is_all_day())
            .filter_map(|e| {
                let date = e.start_date().filter(|d| month.contains(*d))?;
                let (code, _) = self.markers.parse_duty(&e.summary)?;
                Some((date, code))
            });
        Ok(count_month(entries))
    }

    async fn commit_day(
        &self,
        date: NaiveDate,
        assignee: &Assignee,
        displaced: Option<&Assignee>,
    ) -> TransportResult<CommitStatus> {
        let existing = self.duty_event(date).await?;
        let summary = TitleMarkers::duty_title(assignee.code());
        let attendees = Self::attendees(assignee);

        match existing {
            Some((_, code, _)) if code == assignee.code() => Ok(CommitStatus::Unchanged),
            Some((event, code, _)) => {
                let id = event.id.ok_or_else(|| {
                    TransportError::Decode(format!("duty event for {date} has no id"))
                })?;
                let url = self.events_url(&self.oncall_calendar, Some(&id))?;
                let patch = serde_json::json!({
                    "summary": summary,
                    "attendees": attendees,
                });
                let response = self
                    .client
                    .patch(url)
                    .bearer_auth(&self.token)
                    .json(&patch)
                    .send()
                    .await?;
                Self::check("events.patch", response).await?;

                tracing::debug!(
                    date = %date,
                    code = %assignee,
                    was = %code,
                    displaced = displaced.map(|d| d.code()).unwrap_or("-"),
                    "Rewrote duty event"
                );
                Ok(CommitStatus::Updated)
            }
            None => {
                let url = self.events_url(&self.oncall_calendar, None)?;
                let event = Event {
                    summary,
                    attendees,
                    start: Some(EventDateTime {
                        date: Some(date.format("%Y-%m-%d").to_string()),
                        date_time: None,
                    }),
                    end: date.succ_opt().map(|next| EventDateTime {
                        date: Some(next.format("%Y-%m-%d").to_string()),
                        date_time: None,
                    }),
                    ..Default::default()
                };
                let response = self
                    .client
                    .post(url)
                    .bearer_auth(&self.token)
                    .json(&event)
                    .send()
                    .await?;
                Self::check("events.insert", response).await?;

                tracing::debug!(date = %date, code = %assignee, "Created duty event");
                Ok(CommitStatus::Created)
            }
        }
    }
}

#[async_trait]
impl AbsenceSource for GoogleCalendar {
    async fn absence_codes_for(&self, date: NaiveDate) -> TransportResult<Vec<String>> {
        let events = self.day_events(&self.availability_calendar, date).await?;
        Ok(events
            .iter()
            .filter_map(|e| self.markers.parse_absence(&e.summary))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar() -> GoogleCalendar {
        GoogleCalendar::new("token", "team@group.calendar.google.com", Duration::from_secs(5))
            .unwrap()
            .with_api_base("http://localhost:1234/calendar/v3/")
    }

    #[test]
    fn test_events_url_encodes_calendar_id() {
        let url = calendar()
            .events_url("team#1@group.calendar.google.com", Some("evt1"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1234/calendar/v3/calendars/team%231@group.calendar.google.com/events/evt1"
        );
    }

    #[test]
    fn test_new_requires_token() {
        let err = GoogleCalendar::new(" ", "cal", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, TransportError::Auth(_)));
    }

    #[test]
    fn test_all_day_detection() {
        let all_day: Event =
            serde_json::from_str(r#"{"summary":"ab onduty","start":{"date":"2024-01-15"}}"#)
                .unwrap();
        let timed: Event = serde_json::from_str(
            r#"{"summary":"ab onduty","start":{"dateTime":"2024-01-15T09:00:00Z"}}"#,
        )
        .unwrap();

        assert!(all_day.is_all_day());
        assert_eq!(all_day.start_date(), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert!(!timed.is_all_day());
    }

    #[test]
    fn test_read_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, r#"{"access_token":"ya29.abc","token_type":"Bearer"}"#).unwrap();

        assert_eq!(read_token_file(&path).unwrap(), "ya29.abc");
        assert!(read_token_file(dir.path().join("missing.json")).is_err());
    }
}
