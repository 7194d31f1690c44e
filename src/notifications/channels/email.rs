//! SMTP email channel via `lettre`
//!
//! Submits reminders to a mail relay, by default `localhost:25` without
//! authentication. STARTTLS and credentials from `SMTP_USERNAME` /
//! `SMTP_PASSWORD` are used when configured.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};

use super::{Channel, DeliveryStatus, NotifyError, NotifyResult};
use crate::notifications::Reminder;
use crate::utils::default_sender;

/// Relay used when none is configured
pub const DEFAULT_MAIL_SERVER: &str = "localhost:25";

/// Email channel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Relay as `host:port`
    #[serde(default = "default_server")]
    pub server: String,
    /// Sender address; `user@host` when empty
    #[serde(default)]
    pub sender: String,
    /// Upgrade the connection with STARTTLS
    #[serde(default)]
    pub starttls: bool,
}

fn default_server() -> String {
    DEFAULT_MAIL_SERVER.to_string()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            sender: String::new(),
            starttls: false,
        }
    }
}

impl EmailConfig {
    /// Split the relay into host and port (25 when omitted)
    pub fn host_port(&self) -> NotifyResult<(String, u16)> {
        let server = self.server.trim();
        match server.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    NotifyError::InvalidConfig(format!("invalid port in mail server '{server}'"))
                })?;
                Ok((host.to_string(), port))
            }
            None if !server.is_empty() => Ok((server.to_string(), 25)),
            None => Err(NotifyError::InvalidConfig("mail server is empty".into())),
        }
    }
}

/// Sends reminders as plain-text mail
#[derive(Debug)]
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    server: String,
}

impl EmailChannel {
    /// Build the channel from configuration
    pub fn new(config: &EmailConfig) -> NotifyResult<Self> {
        let sender = if config.sender.trim().is_empty() {
            default_sender()
        } else {
            config.sender.clone()
        };
        let from: Mailbox = sender
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::InvalidConfig(e.to_string()))?;

        let (host, port) = config.host_port()?;
        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
                .map_err(|e| NotifyError::InvalidConfig(e.to_string()))?
                .port(port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&host).port(port)
        };

        if let (Ok(username), Ok(password)) =
            (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
        {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            server: format!("{host}:{port}"),
        })
    }

    /// Build the message for a reminder
    pub fn build_message(&self, reminder: &Reminder) -> NotifyResult<Message> {
        let to: Mailbox = reminder
            .person
            .email
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::InvalidConfig(e.to_string()))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&reminder.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(reminder.body.clone())
            .map_err(|e| NotifyError::Smtp(e.to_string()))
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, reminder: &Reminder) -> NotifyResult<DeliveryStatus> {
        if reminder.person.email.is_empty() {
            return Ok(DeliveryStatus::skipped(
                "email",
                format!("no address for {}", reminder.code()),
            ));
        }

        let message = self.build_message(reminder)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            code = %reminder.code(),
            subject = %reminder.subject,
            "Reminder delivered"
        );

        Ok(DeliveryStatus::success_with_message(
            "email",
            format!("Sent to {}", reminder.person.email),
        ))
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name(),
            "server": self.server,
            "from": self.from.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{ReminderTemplates, Urgency};
    use crate::scheduler::roster::Person;
    use chrono::NaiveDate;

    fn reminder(email: &str) -> Reminder {
        ReminderTemplates::new()
            .unwrap()
            .render(
                &Person::new(0, "ab").with_email(email),
                Urgency::Today,
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn test_host_port() {
        let config = EmailConfig::default();
        assert_eq!(config.host_port().unwrap(), ("localhost".to_string(), 25));

        let config = EmailConfig {
            server: "mail.example.com".into(),
            ..Default::default()
        };
        assert_eq!(config.host_port().unwrap().1, 25);

        let config = EmailConfig {
            server: "mail.example.com:abc".into(),
            ..Default::default()
        };
        assert!(config.host_port().is_err());
    }

    #[test]
    fn test_invalid_sender() {
        let config = EmailConfig {
            sender: "not-an-address".into(),
            ..Default::default()
        };
        assert!(matches!(
            EmailChannel::new(&config),
            Err(NotifyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_build_message() {
        let config = EmailConfig {
            sender: "rotator@example.com".into(),
            ..Default::default()
        };
        let channel = EmailChannel::new(&config).unwrap();
        let message = channel.build_message(&reminder("ab@example.com")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("To: ab@example.com"));
        assert!(raw.contains("From: rotator@example.com"));
        assert!(raw.contains("Subject: Reminder: You are on duty today [Mon 15 Jan]"));
    }

    #[tokio::test]
    async fn test_missing_address_skipped() {
        let config = EmailConfig {
            sender: "rotator@example.com".into(),
            ..Default::default()
        };
        let channel = EmailChannel::new(&config).unwrap();
        let status = channel.send(&reminder("")).await.unwrap();

        assert!(status.success);
        assert!(status.message.unwrap().starts_with("skipped"));
    }
}
