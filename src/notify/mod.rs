//! Transactional email.

pub mod brevo;
pub mod templates;

use async_trait::async_trait;
use thiserror::Error;

pub use brevo::BrevoMailer;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),
    #[error("email transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("email api answered {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html_body: impl Into<String>) -> Self {
        Self { to: to.into(), subject: subject.into(), html_body: html_body.into() }
    }

    pub fn validate_recipient(&self) -> Result<(), MailError> {
        if validator::validate_email(self.to.as_str()) { Ok(()) } else { Err(MailError::InvalidRecipient(self.to.clone())) }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Clone)]
pub struct LogMailer { from: String }

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self { Self { from: from.into() } }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        message.validate_recipient()?;
        let preview: String = message.html_body.chars().take(80).collect();
        tracing::info!(to = %message.to, from = %self.from, subject = %message.subject, %preview, "email not delivered, no mail api key");
        Ok(())
    }
}

/// Sends in the background; delivery failures are logged and never reach the caller.
pub fn send_detached(mailer: std::sync::Arc<dyn Mailer>, message: EmailMessage) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&message).await {
            tracing::error!(to = %message.to, subject = %message.subject, error = %e, "email send failed");
        }
    });
}
