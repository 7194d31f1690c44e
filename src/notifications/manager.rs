//! Notification manager for reminder delivery

use chrono::NaiveDate;

use super::channels::{Channel, DeliveryStatus, NotifyError, NotifyResult};
use super::templates::ReminderTemplates;
use super::Urgency;
use crate::scheduler::roster::Assignee;

/// Outcome of one `notify` call
#[derive(Debug, Default)]
pub struct NotificationReport {
    /// Per-channel results, skipped channels included
    pub deliveries: Vec<DeliveryStatus>,

    /// Channels that failed, with their error
    pub failures: Vec<NotifyError>,
}

impl NotificationReport {
    /// True when no channel failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of channels that actually delivered
    pub fn delivered(&self) -> usize {
        self.deliveries
            .iter()
            .filter(|d| d.success && !is_skip(d))
            .count()
    }
}

fn is_skip(status: &DeliveryStatus) -> bool {
    status
        .message
        .as_deref()
        .is_some_and(|m| m.starts_with("skipped"))
}

/// Notification manager that renders reminders and fans them out to channels
pub struct NotificationManager {
    templates: ReminderTemplates,

    /// Registered notification channels
    channels: Vec<Box<dyn Channel>>,
}

impl NotificationManager {
    /// Create a new notification manager
    pub fn new() -> NotifyResult<Self> {
        Ok(Self {
            templates: ReminderTemplates::new()?,
            channels: Vec::new(),
        })
    }

    /// Add a notification channel
    pub fn add_channel(&mut self, channel: Box<dyn Channel>) {
        tracing::debug!(channel = channel.name(), "Channel registered");
        self.channels.push(channel);
    }

    /// Number of registered channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Names of registered channels
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send a reminder to the assignee through every channel
    ///
    /// Shadow and unknown assignees have no contact details and receive
    /// nothing. Channel failures are collected in the report.
    pub async fn notify(
        &self,
        assignee: &Assignee,
        urgency: Urgency,
        today: NaiveDate,
    ) -> NotificationReport {
        let mut report = NotificationReport::default();

        let Some(person) = assignee.person() else {
            tracing::info!(code = %assignee.code(), "No reminder for assignee outside the roster");
            return report;
        };

        let reminder = match self.templates.render(person, urgency, today) {
            Ok(reminder) => reminder,
            Err(e) => {
                tracing::error!(error = %e, "Failed to render reminder");
                report.failures.push(e);
                return report;
            }
        };

        for channel in &self.channels {
            match channel.send(&reminder).await {
                Ok(status) => {
                    tracing::debug!(status = %status, "Channel finished");
                    report.deliveries.push(status);
                }
                Err(e) => {
                    tracing::error!(
                        channel = channel.name(),
                        code = %person.code,
                        error = %e,
                        "Failed to send reminder"
                    );
                    report
                        .deliveries
                        .push(DeliveryStatus::failure(channel.name(), e.to_string()));
                    report.failures.push(e);
                }
            }
        }

        report
    }
}
