//! Ownership checks for location and comment mutations.
//!
//! The caller must be logged in and the entity's author snapshot must carry
//! the caller's exact user ID.

use auth::SessionUser;
use axum::response::Redirect;
use entities::{AuthorSnapshot, Comment, Location};
use location_store::LocationStore;
use tracing::{debug, warn};
use uuid::Uuid;

use super::RequestContext;

pub const LOGIN_REQUIRED_FLASH: &str = "You need to be logged in to do that";
pub const PERMISSION_DENIED_FLASH: &str = "You don't have permission to do that";
pub const LOCATION_NOT_FOUND: &str = "Location not found";
pub const COMMENT_NOT_FOUND: &str = "Comment not found";

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    NotFound(&'static str),
    Forbidden,
}

impl Denial {
    /// Flash message for this denial.
    pub fn message(&self) -> &'static str {
        match *self {
            Denial::Unauthenticated => LOGIN_REQUIRED_FLASH,
            Denial::NotFound(message) => message,
            Denial::Forbidden => PERMISSION_DENIED_FLASH,
        }
    }
}

impl RequestContext {
    /// Returns the logged-in user or [`Denial::Unauthenticated`].
    pub fn require_user(&self) -> Result<SessionUser, Denial> {
        self.user().cloned().ok_or(Denial::Unauthenticated)
    }

    /// Flashes the denial and redirects to the login page or back.
    pub fn deny(&mut self, denial: Denial) -> Redirect {
        self.error(denial.message());
        match denial {
            Denial::Unauthenticated => Redirect::to("/login"),
            Denial::NotFound(_) | Denial::Forbidden => self.redirect_back(),
        }
    }
}

/// Checks that `author` is the caller.
pub fn ensure_owner(author: &AuthorSnapshot, user: &SessionUser) -> Result<(), Denial> {
    if author.is_owned_by(user.id) {
        Ok(())
    } else {
        debug!(user_id = %user.id, author_id = %author.id, "Ownership check failed");
        Err(Denial::Forbidden)
    }
}

/// Parses a path ID. Malformed IDs never match an entity.
pub fn parse_id(id: &str) -> Option<Uuid> {
    id.parse().ok()
}

/// Loads a location, treating malformed IDs and store errors as absent.
pub async fn find_location<S: LocationStore>(store: &S, id: &str) -> Option<Location> {
    let id = parse_id(id)?;
    store
        .get_location(id)
        .await
        .inspect_err(|e| warn!(location_id = %id, error = %e, "Failed to load location"))
        .ok()
        .flatten()
}

/// Loads a comment, treating malformed IDs and store errors as absent.
pub async fn find_comment<S: LocationStore>(store: &S, id: &str) -> Option<Comment> {
    let id = parse_id(id)?;
    store
        .get_comment(id)
        .await
        .inspect_err(|e| warn!(comment_id = %id, error = %e, "Failed to load comment"))
        .ok()
        .flatten()
}

/// Returns the location if the caller owns it.
pub async fn owned_location<S: LocationStore>(
    store: &S,
    context: &RequestContext,
    id: &str,
) -> Result<Location, Denial> {
    let user = context.require_user()?;
    let location = find_location(store, id)
        .await
        .ok_or(Denial::NotFound(LOCATION_NOT_FOUND))?;
    ensure_owner(&location.author, &user)?;
    Ok(location)
}

/// Returns the comment if the caller owns it.
pub async fn owned_comment<S: LocationStore>(
    store: &S,
    context: &RequestContext,
    comment_id: &str,
) -> Result<Comment, Denial> {
    let user = context.require_user()?;
    let comment = find_comment(store, comment_id)
        .await
        .ok_or(Denial::NotFound(COMMENT_NOT_FOUND))?;
    ensure_owner(&comment.author, &user)?;
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use entities::User;
    use location_store::MemoryLocationStore;

    use super::*;
    use crate::middleware::ResponseMode;

    fn session_user(user: &User) -> SessionUser {
        SessionUser {
            id: user.id,
            username: user.username.clone(),
            email: None,
        }
    }

    fn context_for(user: Option<SessionUser>) -> RequestContext {
        let mut context = RequestContext::anonymous(ResponseMode::Redirect);
        if let Some(user) = user {
            context.login(user);
        }
        context
    }

    async fn seeded_store() -> (MemoryLocationStore, User, Location) {
        let store = MemoryLocationStore::new();
        let owner = store
            .create_user(User::new("owner_1", "hash"))
            .await
            .unwrap();
        let location = store
            .create_location(Location::new(
                "Petra",
                "https://img/petra.jpg",
                "Rose city",
                AuthorSnapshot::from(&owner),
            ))
            .await
            .unwrap();
        (store, owner, location)
    }

    #[tokio::test]
    async fn test_owner_passes() {
        let (store, owner, location) = seeded_store().await;
        let context = context_for(Some(session_user(&owner)));

        let found = owned_location(&store, &context, &location.id.to_string())
            .await
            .unwrap();
        assert_eq!(found.id, location.id);
    }

    #[tokio::test]
    async fn test_anonymous_is_unauthenticated_even_for_missing_entity() {
        let (store, _, _) = seeded_store().await;
        let context = context_for(None);

        let denial = owned_location(&store, &context, "not-a-uuid").await.unwrap_err();
        assert_eq!(denial, Denial::Unauthenticated);
    }

    #[tokio::test]
    async fn test_missing_and_malformed_ids_are_not_found() {
        let (store, owner, _) = seeded_store().await;
        let context = context_for(Some(session_user(&owner)));

        for id in ["not-a-uuid".to_string(), Uuid::new_v4().to_string()] {
            assert_eq!(
                owned_location(&store, &context, &id).await.unwrap_err(),
                Denial::NotFound(LOCATION_NOT_FOUND)
            );
            assert_eq!(
                owned_comment(&store, &context, &id).await.unwrap_err(),
                Denial::NotFound(COMMENT_NOT_FOUND)
            );
        }
    }

    #[tokio::test]
    async fn test_other_user_is_forbidden_even_with_same_username() {
        let (store, owner, location) = seeded_store().await;
        let impostor = SessionUser {
            id: Uuid::new_v4(),
            username: owner.username.clone(),
            email: None,
        };
        let context = context_for(Some(impostor));

        let denial = owned_location(&store, &context, &location.id.to_string())
            .await
            .unwrap_err();
        assert_eq!(denial, Denial::Forbidden);
    }

    #[tokio::test]
    async fn test_comment_author_gate() {
        let (store, owner, _) = seeded_store().await;
        let comment = store
            .create_comment(Comment::new("First!", AuthorSnapshot::from(&owner)))
            .await
            .unwrap();
        let comment_id = comment.id.to_string();

        let author = context_for(Some(session_user(&owner)));
        let found = owned_comment(&store, &author, &comment_id).await.unwrap();
        assert_eq!(found.id, comment.id);

        let visitor = context_for(Some(SessionUser {
            id: Uuid::new_v4(),
            username: "visitor_1".to_string(),
            email: None,
        }));
        assert_eq!(
            owned_comment(&store, &visitor, &comment_id).await.unwrap_err(),
            Denial::Forbidden
        );
    }

    #[test]
    fn test_deny_flashes_and_redirects() {
        let mut context = context_for(None);
        let _ = context.deny(Denial::Unauthenticated);
        let _ = context.deny(Denial::Forbidden);

        let page = context.render("landing", ());
        assert_eq!(page.flash.error, vec![LOGIN_REQUIRED_FLASH, PERMISSION_DENIED_FLASH]);
    }
}
