//! Reminder texts rendered with Handlebars

use chrono::{Days, NaiveDate};
use handlebars::Handlebars;
use serde::Serialize;

use super::channels::{NotifyError, NotifyResult};
use super::{Reminder, Urgency};
use crate::scheduler::roster::Person;

const SUBJECT: &str = "Reminder: You are on duty {{when}} [{{date}}]";

const BODY: &str = "Dear {{code}},\r
This is to remind you that you are on duty {{when}}.\r
Have fun!\r
\r
May the queries flow and the pagers be silent.\r
 - the onduty rotator\r
";

const EMERGENCY_SUBJECT: &str = "Attention: You are on duty today! [{{date}}]";

const EMERGENCY_BODY: &str = "Dear {{code}},\r
You are on duty today as the person previously on call is\r
unavailable on short notice. The on duty rota has therefore been moved\r
up by one day.\r
Have fun!\r
\r
May the queries flow and pagers be silent.\r
 - the onduty rotator\r
";

const CHAT: &str = "Hello {{code}}! This is to remind you that you're on duty {{when}}.";

const EMERGENCY_CHAT: &str =
    "Hello {{code}}! The rota has been moved up by one day: you're on duty today ({{date}}).";

/// Date format used in subjects, e.g. "Mon 2 Jan"
pub const DATE_FORMAT: &str = "%a %-d %b";

#[derive(Debug, Serialize)]
struct ReminderData<'a> {
    code: &'a str,
    when: &'a str,
    date: String,
}

/// Registered reminder templates
#[derive(Debug)]
pub struct ReminderTemplates {
    handlebars: Handlebars<'static>,
}

impl ReminderTemplates {
    /// Register the built-in templates
    pub fn new() -> NotifyResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(true);

        for (name, template) in [
            ("subject", SUBJECT),
            ("body", BODY),
            ("chat", CHAT),
            ("emergency_subject", EMERGENCY_SUBJECT),
            ("emergency_body", EMERGENCY_BODY),
            ("emergency_chat", EMERGENCY_CHAT),
        ] {
            handlebars
                .register_template_string(name, template)
                .map_err(|e| NotifyError::Template(e.to_string()))?;
        }

        Ok(Self { handlebars })
    }

    fn render_one(&self, name: &str, data: &ReminderData<'_>) -> NotifyResult<String> {
        self.handlebars
            .render(name, data)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Compose the reminder for a person
    ///
    /// `today` is the date the reminder is sent; tomorrow's reminders refer
    /// to the following day.
    pub fn render(&self, person: &Person, urgency: Urgency, today: NaiveDate) -> NotifyResult<Reminder> {
        let date = today
            .checked_add_days(Days::new(urgency.day_offset()))
            .unwrap_or(today);
        let data = ReminderData {
            code: &person.code,
            when: urgency.when(),
            date: date.format(DATE_FORMAT).to_string(),
        };

        let prefix = if urgency.is_emergency() { "emergency_" } else { "" };
        Ok(Reminder {
            person: person.clone(),
            urgency,
            date,
            subject: self.render_one(&format!("{prefix}subject"), &data)?,
            body: self.render_one(&format!("{prefix}body"), &data)?,
            chat: self.render_one(&format!("{prefix}chat"), &data)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_regular_reminder() {
        let templates = ReminderTemplates::new().unwrap();
        let reminder = templates
            .render(&Person::new(0, "ab"), Urgency::Tomorrow, today())
            .unwrap();

        assert_eq!(reminder.subject, "Reminder: You are on duty tomorrow [Tue 16 Jan]");
        assert!(reminder.body.starts_with("Dear ab,"));
        assert!(reminder.body.contains("you are on duty tomorrow."));
        assert_eq!(reminder.date, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert!(reminder.chat.contains("on duty tomorrow"));
    }

    #[test]
    fn test_emergency_reminder() {
        let templates = ReminderTemplates::new().unwrap();
        let reminder = templates
            .render(&Person::new(0, "ab"), Urgency::Emergency, today())
            .unwrap();

        assert_eq!(reminder.subject, "Attention: You are on duty today! [Mon 15 Jan]");
        assert!(reminder.body.contains("moved\r\nup by one day."));
    }

    #[test]
    fn test_no_html_escaping() {
        let templates = ReminderTemplates::new().unwrap();
        let reminder = templates
            .render(&Person::new(0, "a&b"), Urgency::Today, today())
            .unwrap();
        assert!(reminder.body.starts_with("Dear a&b,"));
    }
}
