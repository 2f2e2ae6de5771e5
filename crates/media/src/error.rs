//! Error types for image handling.

use thiserror::Error;

/// Message shown when the image host rejects our credentials.
pub const IMAGEKIT_AUTH_HINT: &str = "ImageKit authentication failed. Check .env: IMAGEKIT_PRIVATE_KEY, IMAGEKIT_PUBLIC_KEY, and IMAGEKIT_URL have no extra spaces or newlines, and match your ImageKit dashboard.";

/// Errors from image upload.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("No file uploaded. Choose an image file.")]
    NoFile,

    #[error("Image is too large. Maximum size is 5 MB.")]
    TooLarge { size: usize },

    #[error("Only images are allowed (JPEG, PNG, GIF, WebP). Videos and other files are not allowed.")]
    UnsupportedType { mime: String },

    #[error("ImageKit env vars IMAGEKIT_PRIVATE_KEY, IMAGEKIT_PUBLIC_KEY, IMAGEKIT_URL are required")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ImageKit error ({status}): {message}")]
    Provider { status: u16, message: String },
}

impl MediaError {
    /// Returns true for problems with the submitted file itself.
    pub fn is_invalid_file(&self) -> bool {
        matches!(
            self,
            Self::NoFile | Self::TooLarge { .. } | Self::UnsupportedType { .. }
        )
    }

    /// Returns true if the image host refused our credentials.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Provider { status, message } => {
                *status == 403 || message.contains("cannot be authenticated")
            }
            Self::Http(e) => e.status().is_some_and(|s| s.as_u16() == 403),
            _ => false,
        }
    }
}

/// Result type for upload operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors from link image extraction.
///
/// The display text of every variant is safe to show to users.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Please paste a link.")]
    EmptyLink,

    #[error("Link must start with http:// or https://")]
    UnsupportedScheme,

    #[error("This link is not allowed. Use a public web page or direct image URL.")]
    NotAllowed,

    #[error("Request timed out. Try a different link.")]
    Timeout,

    #[error("Could not fetch the page. Check the link or try a direct image URL.")]
    BadStatus { status: u16 },

    #[error("Could not fetch the page. Try a direct image URL instead.")]
    Fetch(String),

    #[error("No image found on this page. Try pasting a direct image URL instead.")]
    NoImageFound,
}

impl ExtractError {
    /// Returns true if the input was rejected before any fetch.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyLink | Self::UnsupportedScheme | Self::NotAllowed
        )
    }
}
