use async_trait::async_trait;
use serde::Serialize;

use super::{EmailMessage, MailError, Mailer};

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// Brevo transactional email API.
#[derive(Clone)]
pub struct BrevoMailer { http: reqwest::Client, api_key: String, from: String, endpoint: String }

#[derive(Serialize)]
struct Address<'a> { email: &'a str }

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> { sender: Address<'a>, to: Vec<Address<'a>>, subject: &'a str, html_content: &'a str }

impl BrevoMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), api_key: api_key.into(), from: from.into(), endpoint: BREVO_SEND_URL.to_string() }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        message.validate_recipient()?;
        let body = SendRequest {
            sender: Address { email: &self.from },
            to: vec![Address { email: &message.to }],
            subject: &message.subject,
            html_content: &message.html_body,
        };
        let resp = self.http.post(&self.endpoint).header("api-key", &self.api_key).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailError::Rejected { status: status.as_u16(), body });
        }
        tracing::info!(to = %message.to, subject = %message.subject, "email sent");
        Ok(())
    }
}
