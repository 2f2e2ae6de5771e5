//! Mail error types.

use thiserror::Error;

/// Errors that can occur while sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// Network failure talking to the provider.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the message.
    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },
}

/// Result type for mail operations.
pub type MailResult<T> = Result<T, MailError>;
