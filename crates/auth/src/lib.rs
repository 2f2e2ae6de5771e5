//! Authentication support for BuenaVista.
//!
//! This crate provides:
//! - Cookie sessions with flash message queues
//! - Argon2 password hashing
//! - Registration and login input validation

mod error;
mod password;
mod session;
mod validation;

pub use error::*;
pub use password::*;
pub use session::*;
pub use validation::*;

/// Session lifetime in days.
pub const SESSION_TTL_DAYS: i64 = 14;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "buenavista.sid";
