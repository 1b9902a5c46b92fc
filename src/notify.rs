//! Alert delivery.
//!
//! Mail goes out through a STARTTLS relay with credentials. Delivery problems
//! are reported to the caller as [`NotifyError`], and [`notify_recipients`]
//! turns them into log lines so nothing upstream ever fails because a mail
//! could not be sent.

use crate::config::SmtpConfig;
use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::SmtpTransport;
use lettre::transport::smtp::authentication::Credentials;
use lettre::Transport;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl NotifyMessage {
    pub fn new(
        recipients: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipients,
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no recipients")]
    NoRecipients,
    #[error("invalid mail address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

pub trait Notifier {
    fn name(&self) -> &str;

    fn send(&self, message: &NotifyMessage) -> Result<(), NotifyError>;
}

pub struct MailNotifier {
    config: SmtpConfig,
    timeout: Duration,
}

impl MailNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self {
            config,
            timeout: SMTP_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_message(&self, message: &NotifyMessage) -> Result<Message, NotifyError> {
        if message.recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(parse_mailbox(&self.config.from)?)
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &message.recipients {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        Ok(builder.body(message.body.clone())?)
    }

    fn transport(&self) -> Result<SmtpTransport, NotifyError> {
        let credentials = Credentials::new(
            self.config.username.clone(),
            self.config.password.expose().to_string(),
        );

        Ok(SmtpTransport::starttls_relay(&self.config.host)?
            .port(self.config.port)
            .credentials(credentials)
            .timeout(Some(self.timeout))
            .build())
    }
}

impl Notifier for MailNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    fn send(&self, message: &NotifyMessage) -> Result<(), NotifyError> {
        let email = self.build_message(message)?;
        self.transport()?.send(&email)?;
        Ok(())
    }
}

/// Writes alerts to the process log instead of mailing them.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, message: &NotifyMessage) -> Result<(), NotifyError> {
        if message.recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }
        info!(
            recipients = %message.recipients.join(", "),
            subject = %message.subject,
            body = %message.body,
            "alert mail (dry run)"
        );
        Ok(())
    }
}

/// Sends one message to `recipients`. Returns whether it was delivered;
/// an empty list sends nothing.
pub fn notify_recipients(
    notifier: &dyn Notifier,
    recipients: &[String],
    subject: &str,
    body: &str,
) -> bool {
    if recipients.is_empty() {
        return false;
    }

    let message = NotifyMessage::new(recipients.to_vec(), subject, body);
    let recipients = recipients.join(", ");
    match notifier.send(&message) {
        Ok(()) => {
            info!(notifier = notifier.name(), "Email sent to {recipients}");
            true
        }
        Err(err) => {
            error!(
                notifier = notifier.name(),
                recipients = %recipients,
                error = %err,
                "Failed to send email"
            );
            false
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|source| NotifyError::Address {
            address: address.to_string(),
            source,
        })
}
