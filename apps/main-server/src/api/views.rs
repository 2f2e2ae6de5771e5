//! Serializable view models for page templates.

use auth::SessionUser;
use chrono::{DateTime, Utc};
use entities::{AuthorSnapshot, Comment, Location};
use media::{DisplaySize, ImageKitClient};
use serde::Serialize;
use uuid::Uuid;

fn is_author(author: &AuthorSnapshot, viewer: Option<&SessionUser>) -> bool {
    viewer.is_some_and(|user| author.is_owned_by(user.id))
}

/// A location as shown on index, show and edit pages.
#[derive(Debug, Clone, Serialize)]
pub struct LocationView {
    pub id: Uuid,
    pub name: String,
    /// Stored image URL.
    pub image: String,
    /// Image URL sized for the page.
    pub display_image: String,
    pub description: String,
    pub author: AuthorSnapshot,
    pub likes: u64,
    /// Whether the viewer likes this location.
    pub liked: bool,
    pub is_owner: bool,
    pub comment_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocationView {
    pub fn new(
        location: &Location,
        viewer: Option<&SessionUser>,
        images: &ImageKitClient,
        size: DisplaySize,
    ) -> Self {
        Self {
            id: location.id,
            name: location.name.clone(),
            image: location.image.clone(),
            display_image: images.display_url(&location.image, size),
            description: location.description.clone(),
            author: location.author.clone(),
            likes: location.likes,
            liked: viewer.is_some_and(|user| location.is_liked_by(user.id)),
            is_owner: is_author(&location.author, viewer),
            comment_count: location.comments.len(),
            created_at: location.created_at,
            updated_at: location.updated_at,
        }
    }
}

/// A comment under a location.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub text: String,
    pub author: AuthorSnapshot,
    pub is_owner: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentView {
    pub fn new(comment: &Comment, viewer: Option<&SessionUser>) -> Self {
        Self {
            id: comment.id,
            text: comment.text.clone(),
            author: comment.author.clone(),
            is_owner: is_author(&comment.author, viewer),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}
