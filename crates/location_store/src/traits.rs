//! Store trait definitions.

use async_trait::async_trait;
use entities::{Comment, Location, User};
use uuid::Uuid;

use crate::StoreResult;

/// Trait for BuenaVista storage operations.
///
/// Every mutation is a whole-document write. Callers perform read-then-write
/// sequences without a concurrency token, so two requests racing on the same
/// document may lose one update.
#[async_trait]
pub trait LocationStore: Send + Sync {
    // =========================================================================
    // User operations
    // =========================================================================

    /// Creates a new user.
    ///
    /// Fails with [`crate::StoreError::DuplicateKey`] when the username or
    /// email is already registered.
    async fn create_user(&self, user: User) -> StoreResult<User>;

    /// Gets a user by ID.
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Finds a user by exact username or by lower-cased email.
    async fn find_user_by_login(&self, username_or_email: &str) -> StoreResult<Option<User>>;

    // =========================================================================
    // Location operations
    // =========================================================================

    /// Creates a new location.
    async fn create_location(&self, location: Location) -> StoreResult<Location>;

    /// Gets a location by ID.
    async fn get_location(&self, id: Uuid) -> StoreResult<Option<Location>>;

    /// Lists locations in creation order.
    async fn list_locations(&self) -> StoreResult<Vec<Location>>;

    /// Returns the like counter of every location.
    async fn list_like_counts(&self) -> StoreResult<Vec<(Uuid, u64)>>;

    /// Replaces a location.
    async fn update_location(&self, location: Location) -> StoreResult<Location>;

    /// Deletes a location. Its comments are left in place.
    async fn delete_location(&self, id: Uuid) -> StoreResult<()>;

    // =========================================================================
    // Comment operations
    // =========================================================================

    /// Creates a new comment.
    async fn create_comment(&self, comment: Comment) -> StoreResult<Comment>;

    /// Gets a comment by ID.
    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;

    /// Resolves comment references in the given order, skipping dangling ones.
    async fn get_comments(&self, ids: &[Uuid]) -> StoreResult<Vec<Comment>>;

    /// Replaces a comment.
    async fn update_comment(&self, comment: Comment) -> StoreResult<Comment>;

    /// Deletes a comment. Parent locations keep their reference.
    async fn delete_comment(&self, id: Uuid) -> StoreResult<()>;
}
