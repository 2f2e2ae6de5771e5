//! In-memory store implementation.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use entities::{Comment, Location, User};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{LocationStore, StoreError, StoreResult};

/// In-memory store for single-process deployments and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryLocationStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    locations: Arc<RwLock<HashMap<Uuid, Location>>>,
    comments: Arc<RwLock<HashMap<Uuid, Comment>>>,
}

impl MemoryLocationStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocationStore for MemoryLocationStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::already_exists("User", user.id.to_string()));
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::duplicate_key("User", "username", &user.username));
        }
        if let Some(email) = user.email() {
            if users.values().any(|u| u.email() == Some(email)) {
                return Err(StoreError::duplicate_key("User", "email", email));
            }
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_user_by_login(&self, username_or_email: &str) -> StoreResult<Option<User>> {
        let email = username_or_email.to_lowercase();
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username == username_or_email || u.email() == Some(email.as_str()))
            .cloned())
    }

    // =========================================================================
    // Location operations
    // =========================================================================

    async fn create_location(&self, location: Location) -> StoreResult<Location> {
        let mut locations = self.locations.write().await;
        if locations.contains_key(&location.id) {
            return Err(StoreError::already_exists(
                "Location",
                location.id.to_string(),
            ));
        }
        locations.insert(location.id, location.clone());
        Ok(location)
    }

    async fn get_location(&self, id: Uuid) -> StoreResult<Option<Location>> {
        let locations = self.locations.read().await;
        Ok(locations.get(&id).cloned())
    }

    async fn list_locations(&self) -> StoreResult<Vec<Location>> {
        let locations = self.locations.read().await;
        let mut result: Vec<Location> = locations.values().cloned().collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(result)
    }

    async fn list_like_counts(&self) -> StoreResult<Vec<(Uuid, u64)>> {
        let locations = self.locations.read().await;
        Ok(locations.values().map(|l| (l.id, l.likes)).collect())
    }

    async fn update_location(&self, location: Location) -> StoreResult<Location> {
        let mut locations = self.locations.write().await;
        if !locations.contains_key(&location.id) {
            return Err(StoreError::not_found("Location", location.id.to_string()));
        }
        locations.insert(location.id, location.clone());
        Ok(location)
    }

    async fn delete_location(&self, id: Uuid) -> StoreResult<()> {
        let mut locations = self.locations.write().await;
        if locations.remove(&id).is_none() {
            return Err(StoreError::not_found("Location", id.to_string()));
        }
        Ok(())
    }

    // =========================================================================
    // Comment operations
    // =========================================================================

    async fn create_comment(&self, comment: Comment) -> StoreResult<Comment> {
        let mut comments = self.comments.write().await;
        if comments.contains_key(&comment.id) {
            return Err(StoreError::already_exists("Comment", comment.id.to_string()));
        }
        comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        let comments = self.comments.read().await;
        Ok(comments.get(&id).cloned())
    }

    async fn get_comments(&self, ids: &[Uuid]) -> StoreResult<Vec<Comment>> {
        let comments = self.comments.read().await;
        Ok(ids.iter().filter_map(|id| comments.get(id).cloned()).collect())
    }

    async fn update_comment(&self, comment: Comment) -> StoreResult<Comment> {
        let mut comments = self.comments.write().await;
        if !comments.contains_key(&comment.id) {
            return Err(StoreError::not_found("Comment", comment.id.to_string()));
        }
        comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete_comment(&self, id: Uuid) -> StoreResult<()> {
        let mut comments = self.comments.write().await;
        if comments.remove(&id).is_none() {
            return Err(StoreError::not_found("Comment", id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use entities::AuthorSnapshot;

    use super::*;

    fn user(username: &str, email: &str) -> User {
        User::new(username, "hash").with_email(email)
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let store = MemoryLocationStore::new();
        store
            .create_user(user("explorer_1", "one@example.com"))
            .await
            .unwrap();

        let err = store
            .create_user(user("explorer_1", "two@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DuplicateKey {
                field: "username",
                ..
            }
        ));

        let err = store
            .create_user(user("explorer_2", "one@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { field: "email", .. }));
    }

    #[tokio::test]
    async fn test_find_user_by_login() {
        let store = MemoryLocationStore::new();
        let created = store
            .create_user(user("explorer_1", "one@example.com"))
            .await
            .unwrap();

        let by_name = store.find_user_by_login("explorer_1").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);

        let by_email = store
            .find_user_by_login("ONE@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(store.find_user_by_login("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_location_crud() {
        let store = MemoryLocationStore::new();
        let author = AuthorSnapshot::new(Uuid::new_v4(), "explorer_1");

        // Create
        let location = Location::new("Petra", "https://example.com/p.jpg", "Rose city", author);
        let created = store.create_location(location).await.unwrap();

        // Get
        let mut fetched = store.get_location(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Petra");

        // Update
        fetched.toggle_like(Uuid::new_v4());
        store.update_location(fetched).await.unwrap();
        let counts = store.list_like_counts().await.unwrap();
        assert_eq!(counts, vec![(created.id, 1)]);

        // List
        let locations = store.list_locations().await.unwrap();
        assert_eq!(locations.len(), 1);

        // Delete
        store.delete_location(created.id).await.unwrap();
        assert!(store.get_location(created.id).await.unwrap().is_none());
        assert!(store.delete_location(created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_list_locations_in_creation_order() {
        let store = MemoryLocationStore::new();
        let author = AuthorSnapshot::new(Uuid::new_v4(), "alice_1");
        let base = chrono::Utc::now();

        for (offset, name) in [(2, "c"), (0, "a"), (1, "b")] {
            let mut location = Location::new(name, "", "", author.clone());
            location.created_at = base + chrono::Duration::seconds(offset);
            store.create_location(location).await.unwrap();
        }

        let names: Vec<String> = store
            .list_locations()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_get_comments_skips_dangling_references() {
        let store = MemoryLocationStore::new();
        let author = AuthorSnapshot::new(Uuid::new_v4(), "explorer_1");

        let first = store
            .create_comment(Comment::new("first", author.clone()))
            .await
            .unwrap();
        let second = store
            .create_comment(Comment::new("second", author))
            .await
            .unwrap();
        store.delete_comment(first.id).await.unwrap();

        let resolved = store
            .get_comments(&[first.id, second.id, Uuid::new_v4()])
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].text, "second");
    }
}
