//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Stored password hash could not be parsed.
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),

    /// Session store failure.
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
