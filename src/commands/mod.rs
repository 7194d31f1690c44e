//! Subcommand implementations and the wiring they share

mod generate;
mod monitor;
mod notify;

pub use generate::{generate, GenerateParams};
pub use monitor::monitor;
pub use notify::notify;

use std::sync::Arc;

use onduty::calendar::google::read_token_file;
use onduty::calendar::{AbsenceSource, GoogleCalendar, LocalCalendar, ScheduleStore};
use onduty::config::{CalendarBackend, Config};
use onduty::error::{Error, Result};
use onduty::notifications::channels::email::EmailChannel;
use onduty::notifications::channels::slack::SlackChannel;
use onduty::notifications::channels::webhook::WebhookChannel;
use onduty::notifications::NotificationManager;

/// Calendar backend opened from configuration
pub struct Backend {
    pub schedule: Arc<dyn ScheduleStore>,
    pub absences: Arc<dyn AbsenceSource>,
}

/// Open the configured calendar backend
pub async fn open_backend(config: &Config) -> Result<Backend> {
    let calendar = &config.calendar;
    match calendar.backend {
        CalendarBackend::Google => {
            let token = match (&calendar.token, &calendar.token_file) {
                (Some(token), _) => token.clone(),
                (None, Some(path)) => read_token_file(path)?,
                (None, None) => {
                    return Err(Error::config(
                        "google backend needs calendar.token_file or ONDUTY_GOOGLE_TOKEN",
                    ))
                }
            };

            let mut google =
                GoogleCalendar::new(token, calendar.oncall_calendar.as_str(), config.request_timeout())?
                    .with_markers(config.markers()?);
            if let Some(availability) = &calendar.availability_calendar {
                google = google.with_availability_calendar(availability.as_str());
            }
            if let Some(api_base) = &calendar.api_base {
                google = google.with_api_base(api_base.as_str());
            }

            tracing::debug!(calendar = %calendar.oncall_calendar, "Using Google Calendar backend");
            let google = Arc::new(google);
            Ok(Backend {
                schedule: google.clone(),
                absences: google,
            })
        }
        CalendarBackend::Local => {
            let local = Arc::new(LocalCalendar::open(&calendar.local_file).await?);
            tracing::debug!(path = %calendar.local_file.display(), "Using local calendar backend");
            Ok(Backend {
                schedule: local.clone(),
                absences: local,
            })
        }
    }
}

/// Build the reminder dispatcher from configuration
pub fn notification_manager(config: &Config) -> Result<NotificationManager> {
    let mut manager = NotificationManager::new()?;

    if config.mail.enabled {
        manager.add_channel(Box::new(EmailChannel::new(&config.mail.smtp)?));
    }

    if let Some(slack) = config.slack.as_ref().filter(|s| !s.token.trim().is_empty()) {
        manager.add_channel(Box::new(SlackChannel::new(slack.clone())?));
    }

    if let Some(webhook) = &config.webhook {
        manager.add_channel(Box::new(WebhookChannel::new(webhook.clone())?));
    }

    if manager.channel_count() == 0 {
        tracing::warn!("No notification channels configured");
    }
    Ok(manager)
}

/// Today in local time
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
