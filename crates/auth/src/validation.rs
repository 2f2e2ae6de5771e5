//! Registration and login validation.
//!
//! Username: 5-30 chars, letters, numbers and underscores only.
//! Email: valid address with a dotted domain.
//! Password: 8-128 chars.

use std::str::FromStr;

use email_address::EmailAddress;

pub const USERNAME_MIN: usize = 5;
pub const USERNAME_MAX: usize = 30;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;

/// Message for a username that is already registered.
pub const DUPLICATE_USERNAME_MESSAGE: &str =
    "That username is already taken. Please choose another.";

/// Message for an email that is already registered.
pub const DUPLICATE_EMAIL_MESSAGE: &str =
    "That email is already registered. Sign in or use a different email.";

const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";
const LOGIN_REQUIRED_FIELDS_MESSAGE: &str = "Please enter your username or email and password.";

/// Outcome of validating a registration form.
///
/// The normalized values are returned even when validation fails so the
/// form can be re-populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Outcome of validating a login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginValidation {
    pub valid: bool,
    pub message: Option<String>,
}

fn username_errors(username: &str) -> Vec<String> {
    if username.is_empty() {
        return vec!["Username is required.".to_string()];
    }

    let mut errors = Vec::new();
    let length = username.chars().count();
    if length < USERNAME_MIN {
        errors.push(format!("Username must be at least {USERNAME_MIN} characters."));
    }
    if length > USERNAME_MAX {
        errors.push(format!("Username must be at most {USERNAME_MAX} characters."));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        errors.push(
            "Username can only contain letters, numbers, and underscores (no spaces or special characters)."
                .to_string(),
        );
    }
    errors
}

fn email_errors(email: &str) -> Vec<String> {
    if email.is_empty() {
        return vec!["Email is required.".to_string()];
    }
    if !is_email(email) {
        return vec!["Please enter a valid email address.".to_string()];
    }
    Vec::new()
}

fn password_errors(password: &str) -> Vec<String> {
    if password.is_empty() {
        return vec!["Password is required.".to_string()];
    }

    let mut errors = Vec::new();
    let length = password.chars().count();
    if length < PASSWORD_MIN {
        errors.push(format!("Password must be at least {PASSWORD_MIN} characters."));
    }
    if length > PASSWORD_MAX {
        errors.push(format!("Password must be at most {PASSWORD_MAX} characters."));
    }
    errors
}

/// Returns true for a syntactically valid address whose domain has a TLD.
pub fn is_email(email: &str) -> bool {
    match EmailAddress::from_str(email) {
        Ok(address) => {
            let domain = address.domain();
            match domain.rsplit_once('.') {
                Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
                None => false,
            }
        }
        Err(_) => false,
    }
}

/// Validates registration input.
///
/// All inputs are trimmed and the email is lower-cased. Every violated rule
/// contributes its own message.
pub fn validate_register(username: &str, email: &str, password: &str) -> RegisterValidation {
    let username = username.trim().to_string();
    let email = email.trim().to_lowercase();
    let password = password.trim().to_string();

    let mut errors = username_errors(&username);
    errors.extend(email_errors(&email));
    errors.extend(password_errors(&password));

    RegisterValidation {
        valid: errors.is_empty(),
        errors,
        username,
        email,
        password,
    }
}

/// Validates login input.
///
/// Only presence is checked, and a single generic message is returned so
/// the response does not reveal which field was wrong.
pub fn validate_login(username_or_email: &str, password: &str) -> LoginValidation {
    if username_or_email.trim().is_empty() || password.trim().is_empty() {
        return LoginValidation {
            valid: false,
            message: Some(LOGIN_REQUIRED_FIELDS_MESSAGE.to_string()),
        };
    }
    LoginValidation {
        valid: true,
        message: None,
    }
}

/// Known shapes of a failed registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterFailure {
    /// Unique constraint violated on `field`.
    DuplicateKey { field: String },
    /// Field-level validation failure.
    Validation {
        username: Option<String>,
        email: Option<String>,
        message: String,
    },
    /// Free-text failure.
    Other { message: Option<String> },
}

/// Maps a registration failure to user-facing text.
pub fn map_register_error(failure: &RegisterFailure) -> String {
    match failure {
        RegisterFailure::DuplicateKey { field } if field == "email" => {
            DUPLICATE_EMAIL_MESSAGE.to_string()
        }
        RegisterFailure::DuplicateKey { .. } => DUPLICATE_USERNAME_MESSAGE.to_string(),
        RegisterFailure::Validation {
            username,
            email,
            message,
        } => username
            .as_ref()
            .or(email.as_ref())
            .unwrap_or(message)
            .clone(),
        RegisterFailure::Other { message: Some(message) } if message.contains("UserExistsError") => {
            DUPLICATE_USERNAME_MESSAGE.to_string()
        }
        RegisterFailure::Other { message: Some(message) } if !message.is_empty() => message.clone(),
        RegisterFailure::Other { .. } => GENERIC_FAILURE_MESSAGE.to_string(),
    }
}
