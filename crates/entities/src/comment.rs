//! Comment entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuthorSnapshot;

/// A comment left on a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Unique identifier.
    pub id: Uuid,
    /// Comment body.
    pub text: String,
    /// Author captured at creation time.
    pub author: AuthorSnapshot,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    /// Creates a new comment.
    pub fn new(text: impl Into<String>, author: AuthorSnapshot) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            author,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the body and bumps `updated_at`.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_creation() {
        let author = AuthorSnapshot::new(Uuid::new_v4(), "explorer_1");
        let comment = Comment::new("Great view!", author.clone());

        assert_eq!(comment.text, "Great view!");
        assert_eq!(comment.author, author);
        assert_eq!(comment.created_at, comment.updated_at);
    }

    #[test]
    fn test_set_text() {
        let mut comment = Comment::new("Great view!", AuthorSnapshot::new(Uuid::new_v4(), "a"));
        comment.set_text("Even better at sunset");
        assert_eq!(comment.text, "Even better at sunset");
    }
}
