//! Transactional email for BuenaVista.
//!
//! Three notifications are sent: onboarding after registration, a
//! confirmation when a location is posted, and a notice to a location's
//! author when someone else comments. Delivery never fails the caller:
//! missing configuration skips the send and provider errors are logged.

mod error;
pub mod templates;
mod transport;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use error::*;
pub use templates::{RenderedEmail, DEFAULT_APP_URL};
pub use transport::*;

/// Sender for informational notices.
pub const FROM_INFO: &str = "BuenaVista <info@buenavista.in>";

/// Sender for the welcome email.
pub const FROM_WELCOME: &str = "BuenaVista <welcome@buenavista.in>";

/// A notification to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailJob {
    /// Welcome email after registration.
    Onboarding { to: String, username: String },
    /// Confirmation that a location was posted.
    LocationCreated {
        to: String,
        username: String,
        location_name: String,
        location_id: String,
    },
    /// Notice that someone commented on the recipient's location.
    CommentReceived {
        to: String,
        recipient_username: String,
        location_name: String,
        location_id: String,
        commenter_username: String,
        comment_text: String,
    },
}

impl EmailJob {
    fn kind(&self) -> &'static str {
        match self {
            Self::Onboarding { .. } => "onboarding",
            Self::LocationCreated { .. } => "location-created",
            Self::CommentReceived { .. } => "comment-notification",
        }
    }

    fn recipient(&self) -> &str {
        match self {
            Self::Onboarding { to, .. }
            | Self::LocationCreated { to, .. }
            | Self::CommentReceived { to, .. } => to,
        }
    }
}

/// What happened to a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Skipped,
    Failed,
}

/// Renders and delivers notifications.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<Arc<dyn MailTransport>>,
    app_url: String,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("configured", &self.transport.is_some())
            .field("app_url", &self.app_url)
            .finish()
    }
}

impl Mailer {
    /// Creates a mailer. Without a transport every send is skipped.
    pub fn new(transport: Option<Arc<dyn MailTransport>>, app_url: impl Into<String>) -> Self {
        Self {
            transport,
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Creates a mailer backed by Resend when an API key is configured.
    pub fn from_api_key(api_key: Option<&str>, app_url: impl Into<String>) -> Self {
        let transport = api_key
            .filter(|key| !key.is_empty())
            .map(|key| Arc::new(ResendTransport::new(key)) as Arc<dyn MailTransport>);
        Self::new(transport, app_url)
    }

    /// Returns true if a provider is configured.
    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Returns the public URL used in links.
    pub fn app_url(&self) -> &str {
        &self.app_url
    }

    /// Delivers the job on a detached task.
    ///
    /// The returned handle may be dropped; the send runs to completion
    /// independently of the caller.
    pub fn dispatch(&self, job: EmailJob) -> JoinHandle<DeliveryOutcome> {
        let mailer = self.clone();
        tokio::spawn(async move { mailer.deliver(job).await })
    }

    /// Renders and sends the job, logging instead of failing.
    pub async fn deliver(&self, job: EmailJob) -> DeliveryOutcome {
        let kind = job.kind();

        let Some(transport) = &self.transport else {
            warn!(kind, "RESEND_API_KEY not set; skipping email");
            return DeliveryOutcome::Skipped;
        };
        if job.recipient().trim().is_empty() {
            return DeliveryOutcome::Skipped;
        }

        let message = self.render(job);
        match transport.send(&message).await {
            Ok(()) => {
                info!(kind, to = %message.to, "Email sent");
                DeliveryOutcome::Sent
            }
            Err(e) => {
                error!(kind, to = %message.to, error = %e, "Email delivery failed");
                DeliveryOutcome::Failed
            }
        }
    }

    fn view_url(&self, location_id: &str) -> String {
        format!("{}/locations/{}", self.app_url, location_id)
    }

    fn render(&self, job: EmailJob) -> EmailMessage {
        let (from, to, rendered) = match job {
            EmailJob::Onboarding { to, username } => (
                FROM_WELCOME,
                to,
                templates::onboarding_email(Some(&username), &self.app_url),
            ),
            EmailJob::LocationCreated {
                to,
                username,
                location_name,
                location_id,
            } => (
                FROM_INFO,
                to,
                templates::location_created_email(
                    Some(&username),
                    Some(&location_name),
                    &self.view_url(&location_id),
                ),
            ),
            EmailJob::CommentReceived {
                to,
                recipient_username,
                location_name,
                location_id,
                commenter_username,
                comment_text,
            } => (
                FROM_INFO,
                to,
                templates::comment_notification_email(
                    Some(&recipient_username),
                    Some(&location_name),
                    Some(&commenter_username),
                    &comment_text,
                    &self.view_url(&location_id),
                ),
            ),
        };

        EmailMessage {
            from: from.to_string(),
            to,
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, message: &EmailMessage) -> MailResult<()> {
            self.sent.lock().unwrap().push(message.clone());
            if self.fail {
                return Err(MailError::Provider {
                    status: 422,
                    message: "invalid recipient".to_string(),
                });
            }
            Ok(())
        }
    }

    fn onboarding(to: &str) -> EmailJob {
        EmailJob::Onboarding {
            to: to.to_string(),
            username: "explorer_1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_skips_without_provider() {
        let mailer = Mailer::from_api_key(None, DEFAULT_APP_URL);
        assert!(!mailer.is_configured());
        assert_eq!(
            mailer.deliver(onboarding("a@example.com")).await,
            DeliveryOutcome::Skipped
        );
    }

    #[tokio::test]
    async fn test_skips_empty_recipient() {
        let transport = Arc::new(RecordingTransport::default());
        let mailer = Mailer::new(Some(transport.clone()), DEFAULT_APP_URL);

        assert_eq!(mailer.deliver(onboarding("")).await, DeliveryOutcome::Skipped);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_sends_rendered_message() {
        let transport = Arc::new(RecordingTransport::default());
        let mailer = Mailer::new(Some(transport.clone()), "https://example.com/");

        let outcome = mailer
            .dispatch(EmailJob::LocationCreated {
                to: "a@example.com".to_string(),
                username: "explorer_1".to_string(),
                location_name: "Petra".to_string(),
                location_id: "abc".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Sent);
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, FROM_INFO);
        assert_eq!(sent[0].to, "a@example.com");
        assert!(sent[0].html.contains("https://example.com/locations/abc"));
    }

    #[tokio::test]
    async fn test_provider_error_is_swallowed() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let mailer = Mailer::new(Some(transport), DEFAULT_APP_URL);

        assert_eq!(
            mailer.deliver(onboarding("a@example.com")).await,
            DeliveryOutcome::Failed
        );
    }

    #[tokio::test]
    async fn test_onboarding_uses_welcome_sender() {
        let transport = Arc::new(RecordingTransport::default());
        let mailer = Mailer::new(Some(transport.clone()), DEFAULT_APP_URL);

        mailer.deliver(onboarding("a@example.com")).await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].from, FROM_WELCOME);
        assert_eq!(sent[0].subject, "Hola, explorer_1! Welcome to BuenaVista");
    }
}
