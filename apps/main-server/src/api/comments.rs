//! Comment endpoints nested under a location.

use auth::SessionUser;
use axum::{
    Form, Json,
    extract::{Path, State},
    response::{Redirect, Response},
};
use entities::{AuthorSnapshot, Comment, Location};
use location_store::{LocationStore, StoreResult};
use mailer::EmailJob;
use media::DisplaySize;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::api::views::{CommentView, LocationView};
use crate::middleware::{
    Denial, RequestContext,
    ownership::{LOCATION_NOT_FOUND, find_location, owned_comment},
};
use crate::state::{AppState, SharedState};

const EMPTY_COMMENT_MESSAGE: &str = "Comment cannot be empty.";

/// Comment form.
#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default, rename = "comment[text]")]
    pub text: String,
}

#[derive(Debug, Serialize)]
struct NewLocals {
    location: LocationView,
}

#[derive(Debug, Serialize)]
struct EditLocals {
    location_id: String,
    comment: CommentView,
}

fn location_path(id: impl std::fmt::Display) -> String {
    format!("/locations/{id}")
}

/// `GET /locations/{id}/comments/new`
pub async fn new_form<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Path(id): Path<String>,
) -> Response {
    let Ok(user) = ctx.require_user() else {
        let redirect = ctx.deny(Denial::Unauthenticated);
        return ctx.finish(&state, redirect).await;
    };

    let Some(location) = find_location(&state.store, &id).await else {
        ctx.error(LOCATION_NOT_FOUND);
        return ctx.finish(&state, Redirect::to("/locations")).await;
    };

    let location = LocationView::new(&location, Some(&user), &state.images, DisplaySize::Show);
    let page = ctx.render("comments/new", NewLocals { location });
    ctx.finish(&state, Json(page)).await
}

async fn attach_comment<S: LocationStore>(
    store: &S,
    mut location: Location,
    comment: Comment,
) -> StoreResult<(Location, Comment)> {
    let comment = store.create_comment(comment).await?;
    location.add_comment(comment.id);
    let location = store.update_location(location).await?;
    Ok((location, comment))
}

/// Emails the location's author about a new comment by someone else.
async fn notify_author<S: LocationStore>(
    state: &AppState<S>,
    location: &Location,
    commenter: &SessionUser,
    comment: &Comment,
) {
    if location.author.is_owned_by(commenter.id) {
        return;
    }

    let author = match state.store.get_user(location.author.id).await {
        Ok(Some(author)) => author,
        Ok(None) => return,
        Err(e) => {
            warn!(user_id = %location.author.id, error = %e, "Failed to load location author");
            return;
        }
    };
    let Some(email) = author.email() else {
        return;
    };

    let recipient_username = if author.username.is_empty() {
        location.author.username.clone()
    } else {
        author.username.clone()
    };

    state.mailer.dispatch(EmailJob::CommentReceived {
        to: email.to_string(),
        recipient_username,
        location_name: location.name.clone(),
        location_id: location.id.to_string(),
        commenter_username: commenter.username.clone(),
        comment_text: comment.text.clone(),
    });
}

/// `POST /locations/{id}/comments`
pub async fn create<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let Ok(user) = ctx.require_user() else {
        let redirect = ctx.deny(Denial::Unauthenticated);
        return ctx.finish(&state, redirect).await;
    };

    let Some(location) = find_location(&state.store, &id).await else {
        ctx.error(LOCATION_NOT_FOUND);
        return ctx.finish(&state, Redirect::to("/locations")).await;
    };

    let text = form.text.trim();
    if text.is_empty() {
        ctx.error(EMPTY_COMMENT_MESSAGE);
        let back = ctx.redirect_back();
        return ctx.finish(&state, back).await;
    }

    let comment = Comment::new(text, AuthorSnapshot::new(user.id, &user.username));
    let (location, comment) = match attach_comment(&state.store, location, comment).await {
        Ok(saved) => saved,
        Err(e) => {
            error!(location_id = %id, error = %e, "Failed to add comment");
            ctx.error("Something went wrong");
            return ctx.finish(&state, Redirect::to("/locations")).await;
        }
    };

    info!(location_id = %location.id, comment_id = %comment.id, "Comment added");
    ctx.success("Comment added successfully!");
    let response = ctx
        .finish(&state, Redirect::to(&location_path(location.id)))
        .await;

    notify_author(&state, &location, &user, &comment).await;
    response
}

/// `GET /locations/{id}/comments/{comment_id}/edit`
pub async fn edit_form<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Path((id, comment_id)): Path<(String, String)>,
) -> Response {
    let comment = match owned_comment(&state.store, &ctx, &comment_id).await {
        Ok(comment) => comment,
        Err(denial) => {
            let redirect = ctx.deny(denial);
            return ctx.finish(&state, redirect).await;
        }
    };

    let viewer = ctx.user().cloned();
    let locals = EditLocals {
        location_id: id,
        comment: CommentView::new(&comment, viewer.as_ref()),
    };
    let page = ctx.render("comments/edit", locals);
    ctx.finish(&state, Json(page)).await
}

/// `PUT /locations/{id}/comments/{comment_id}`
pub async fn update<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Path((id, comment_id)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> Response {
    let mut comment = match owned_comment(&state.store, &ctx, &comment_id).await {
        Ok(comment) => comment,
        Err(denial) => {
            let redirect = ctx.deny(denial);
            return ctx.finish(&state, redirect).await;
        }
    };

    let text = form.text.trim();
    if text.is_empty() {
        ctx.error(EMPTY_COMMENT_MESSAGE);
        let back = ctx.redirect_back();
        return ctx.finish(&state, back).await;
    }

    comment.set_text(text);
    match state.store.update_comment(comment).await {
        Ok(comment) => {
            info!(comment_id = %comment.id, "Comment updated");
            ctx.success("Comment updated successfully!");
            ctx.finish(&state, Redirect::to(&location_path(&id))).await
        }
        Err(e) => {
            error!(comment_id = %comment_id, error = %e, "Failed to update comment");
            ctx.error("Could not update comment");
            let back = ctx.redirect_back();
            ctx.finish(&state, back).await
        }
    }
}

/// `DELETE /locations/{id}/comments/{comment_id}`
pub async fn delete<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Path((id, comment_id)): Path<(String, String)>,
) -> Response {
    let comment = match owned_comment(&state.store, &ctx, &comment_id).await {
        Ok(comment) => comment,
        Err(denial) => {
            let redirect = ctx.deny(denial);
            return ctx.finish(&state, redirect).await;
        }
    };

    match state.store.delete_comment(comment.id).await {
        Ok(()) => {
            info!(comment_id = %comment.id, "Comment deleted");
            ctx.success("Comment deleted successfully!");
            ctx.finish(&state, Redirect::to(&location_path(&id))).await
        }
        Err(e) => {
            error!(comment_id = %comment.id, error = %e, "Failed to delete comment");
            ctx.error("Could not delete comment");
            let back = ctx.redirect_back();
            ctx.finish(&state, back).await
        }
    }
}

#[cfg(test)]
mod tests {
    use location_store::MemoryLocationStore;
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn test_attach_comment_links_location() {
        let store = MemoryLocationStore::new();
        let author = AuthorSnapshot::new(Uuid::new_v4(), "owner_1");
        let location = store
            .create_location(Location::new("Petra", "", "", author.clone()))
            .await
            .unwrap();

        let (location, comment) = attach_comment(&store, location, Comment::new("Lovely", author))
            .await
            .unwrap();

        assert_eq!(location.comments, vec![comment.id]);
        let stored = store.get_location(location.id).await.unwrap().unwrap();
        assert_eq!(stored.comments, vec![comment.id]);
    }
}
