//! Location post entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuthorSnapshot;

/// A location shared by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Unique identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Image URL (uploaded or pasted).
    pub image: String,
    /// Free-form description.
    pub description: String,
    /// Author captured at creation time.
    pub author: AuthorSnapshot,
    /// Like counter. Always equal to `liked_by.len()`.
    pub likes: u64,
    /// IDs of users who liked this location, each at most once.
    pub liked_by: Vec<Uuid>,
    /// IDs of comments posted on this location, in creation order.
    pub comments: Vec<Uuid>,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Result of toggling a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOutcome {
    /// Like count after the toggle.
    pub likes: u64,
    /// Whether the caller likes the location after the toggle.
    pub liked: bool,
}

/// Editable fields of a location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl Location {
    /// Creates a new location.
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        description: impl Into<String>,
        author: AuthorSnapshot,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            image: image.into(),
            description: description.into(),
            author,
            likes: 0,
            liked_by: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the user currently likes this location.
    pub fn is_liked_by(&self, user_id: Uuid) -> bool {
        self.liked_by.contains(&user_id)
    }

    /// Toggles the user's like.
    ///
    /// A user already in `liked_by` is removed and the counter decremented,
    /// floored at zero; otherwise the user is added and the counter
    /// incremented.
    pub fn toggle_like(&mut self, user_id: Uuid) -> LikeOutcome {
        let already_liked = self.is_liked_by(user_id);

        if already_liked {
            self.liked_by.retain(|id| *id != user_id);
            self.likes = self.likes.saturating_sub(1);
        } else {
            self.liked_by.push(user_id);
            self.likes += 1;
        }

        LikeOutcome {
            likes: self.likes,
            liked: !already_liked,
        }
    }

    /// Appends a comment reference.
    pub fn add_comment(&mut self, comment_id: Uuid) {
        if !self.comments.contains(&comment_id) {
            self.comments.push(comment_id);
        }
    }

    /// Applies an owner edit and bumps `updated_at`.
    pub fn apply_update(&mut self, update: LocationUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        self.updated_at = Utc::now();
    }
}
