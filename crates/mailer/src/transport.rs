//! Email delivery transports.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::{MailError, MailResult};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// A fully rendered outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Trait for delivering email.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Sends a message.
    async fn send(&self, message: &EmailMessage) -> MailResult<()>;
}

/// Transport for the Resend HTTP API.
pub struct ResendTransport {
    api_key: String,
    api_url: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for ResendTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendTransport")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl ResendTransport {
    /// Creates a transport with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: RESEND_API_URL.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Overrides the API endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[async_trait]
impl MailTransport for ResendTransport {
    async fn send(&self, message: &EmailMessage) -> MailResult<()> {
        debug!(to = %message.to, subject = %message.subject, "Sending email via Resend");

        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            return Err(MailError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
