//! Author snapshot embedded in posts and comments.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::User;

/// Author identity copied onto a location or comment when it is created.
///
/// The snapshot is never refreshed: renaming a user does not rewrite the
/// username stored on their earlier posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSnapshot {
    /// ID of the user who created the entity.
    pub id: Uuid,
    /// Username at the time of creation.
    pub username: String,
}

impl AuthorSnapshot {
    /// Creates a new author snapshot.
    pub fn new(id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }

    /// Returns true if the given user ID is the author.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.id == user_id
    }
}

impl From<&User> for AuthorSnapshot {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.username.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership_is_exact_id_match() {
        let id = Uuid::new_v4();
        let author = AuthorSnapshot::new(id, "explorer_1");

        assert!(author.is_owned_by(id));
        assert!(!author.is_owned_by(Uuid::new_v4()));
    }

    #[test]
    fn test_snapshot_from_user() {
        let user = User::new("explorer_1", "hash");
        let author = AuthorSnapshot::from(&user);

        assert_eq!(author.id, user.id);
        assert_eq!(author.username, "explorer_1");
    }
}
