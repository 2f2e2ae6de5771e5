//! Location endpoints: CRUD, likes, image upload and link extraction.

use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{FromRequest, Multipart, Path, Request, State, multipart::MultipartError},
    http::{StatusCode, header::{CACHE_CONTROL, CONTENT_TYPE}},
    response::{IntoResponse, Redirect, Response},
};
use entities::{AuthorSnapshot, LikeOutcome, Location, LocationUpdate};
use location_store::LocationStore;
use mailer::EmailJob;
use media::{DisplaySize, ExtractError, IMAGEKIT_AUTH_HINT, MAX_IMAGE_SIZE, MediaError, MediaResult, check_image};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::api::views::{CommentView, LocationView};
use crate::error::{ServerError, ServerResult};
use crate::middleware::{
    Denial, RequestContext, ResponseMode,
    ownership::{LOCATION_NOT_FOUND, find_location, owned_location, parse_id},
};
use crate::state::SharedState;

/// Request body limit for image uploads. Leaves room for multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_SIZE + 1024 * 1024;

const UPLOAD_FAILED_MESSAGE: &str = "Image upload failed. Try again or use an image URL instead.";
const LIKE_FAILED_MESSAGE: &str = "Could not update likes";

/// New location form.
#[derive(Debug, Default, Deserialize)]
pub struct NewLocationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
}

/// Edit form. Only these three fields can change.
#[derive(Debug, Default, Deserialize)]
pub struct EditLocationForm {
    #[serde(default, rename = "group[name]")]
    pub name: Option<String>,
    #[serde(default, rename = "group[image]")]
    pub image: Option<String>,
    #[serde(default, rename = "group[description]")]
    pub description: Option<String>,
}

impl From<EditLocationForm> for LocationUpdate {
    fn from(form: EditLocationForm) -> Self {
        Self {
            name: form.name,
            image: form.image,
            description: form.description,
        }
    }
}

/// Link extraction request.
#[derive(Debug, Default, Deserialize)]
pub struct ExtractImageRequest {
    #[serde(default)]
    pub url: String,
}

/// Accepts a JSON or urlencoded body depending on `Content-Type`.
#[derive(Debug)]
pub struct JsonOrForm<T>(pub T);

impl<T, St> FromRequest<St> for JsonOrForm<T>
where
    T: DeserializeOwned + Send,
    St: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &St) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
            Ok(Self(value))
        }
    }
}

#[derive(Debug, Serialize)]
struct IndexLocals {
    locations: Vec<LocationView>,
}

#[derive(Debug, Serialize)]
struct ShowLocals {
    location: LocationView,
    comments: Vec<CommentView>,
}

#[derive(Debug, Serialize)]
struct EditLocals {
    location: LocationView,
}

/// `GET /locations`
pub async fn index<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
) -> Response {
    let locations = match state.store.list_locations().await {
        Ok(locations) => locations,
        Err(e) => {
            error!(error = %e, "Failed to list locations");
            ctx.error("Something went wrong");
            return ctx.finish(&state, Redirect::to("/")).await;
        }
    };

    let viewer = ctx.user().cloned();
    let locations = locations
        .iter()
        .map(|location| LocationView::new(location, viewer.as_ref(), &state.images, DisplaySize::Thumb))
        .collect();

    let page = ctx.render("locations/index", IndexLocals { locations });
    ctx.finish(&state, ([(CACHE_CONTROL, "private, no-store")], Json(page)))
        .await
}

/// `GET /locations/api/likes`
pub async fn api_likes<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
) -> ServerResult<impl IntoResponse> {
    let counts = state.store.list_like_counts().await.map_err(|e| {
        error!(error = %e, "Failed to load like counts");
        ServerError::Internal("Could not load like counts".to_string())
    })?;

    let likes: HashMap<String, u64> = counts
        .into_iter()
        .map(|(id, likes)| (id.to_string(), likes))
        .collect();

    Ok(([(CACHE_CONTROL, "no-store")], Json(likes)))
}

/// `GET /locations/new`
pub async fn new_form<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
) -> Response {
    if ctx.user().is_none() {
        let redirect = ctx.deny(Denial::Unauthenticated);
        return ctx.finish(&state, redirect).await;
    }

    let page = ctx.render("locations/new", json!({}));
    ctx.finish(&state, Json(page)).await
}

/// `POST /locations`
pub async fn create<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Form(form): Form<NewLocationForm>,
) -> Response {
    let Ok(user) = ctx.require_user() else {
        let redirect = ctx.deny(Denial::Unauthenticated);
        return ctx.finish(&state, redirect).await;
    };

    let location = Location::new(
        form.name,
        form.image,
        form.description,
        AuthorSnapshot::new(user.id, &user.username),
    );

    let location = match state.store.create_location(location).await {
        Ok(location) => location,
        Err(e) => {
            error!(user_id = %user.id, error = %e, "Failed to create location");
            ctx.error("Could not create location");
            return ctx.finish(&state, Redirect::to("/locations")).await;
        }
    };

    info!(location_id = %location.id, user_id = %user.id, "Location created");
    ctx.success("Location created successfully!");
    let response = ctx.finish(&state, Redirect::to("/locations")).await;

    if let Some(email) = user.email.filter(|email| !email.is_empty()) {
        state.mailer.dispatch(EmailJob::LocationCreated {
            to: email,
            username: user.username,
            location_name: location.name,
            location_id: location.id.to_string(),
        });
    }

    response
}

/// `GET /locations/{id}`
pub async fn show<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Path(id): Path<String>,
) -> Response {
    let Some(location) = find_location(&state.store, &id).await else {
        ctx.error(LOCATION_NOT_FOUND);
        return ctx.finish(&state, Redirect::to("/locations")).await;
    };

    let comments = match state.store.get_comments(&location.comments).await {
        Ok(comments) => comments,
        Err(e) => {
            error!(location_id = %location.id, error = %e, "Failed to load comments");
            ctx.error(LOCATION_NOT_FOUND);
            return ctx.finish(&state, Redirect::to("/locations")).await;
        }
    };

    let viewer = ctx.user().cloned();
    let locals = ShowLocals {
        location: LocationView::new(&location, viewer.as_ref(), &state.images, DisplaySize::Show),
        comments: comments
            .iter()
            .map(|comment| CommentView::new(comment, viewer.as_ref()))
            .collect(),
    };

    let page = ctx.render("locations/show", locals);
    ctx.finish(&state, Json(page)).await
}

/// `GET /locations/{id}/edit`
pub async fn edit_form<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Path(id): Path<String>,
) -> Response {
    let location = match owned_location(&state.store, &ctx, &id).await {
        Ok(location) => location,
        Err(denial) => {
            let redirect = ctx.deny(denial);
            return ctx.finish(&state, redirect).await;
        }
    };

    let viewer = ctx.user().cloned();
    let location = LocationView::new(&location, viewer.as_ref(), &state.images, DisplaySize::Show);
    let page = ctx.render("locations/edit", EditLocals { location });
    ctx.finish(&state, Json(page)).await
}

/// `PUT /locations/{id}`
pub async fn update<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Path(id): Path<String>,
    Form(form): Form<EditLocationForm>,
) -> Response {
    let mut location = match owned_location(&state.store, &ctx, &id).await {
        Ok(location) => location,
        Err(denial) => {
            let redirect = ctx.deny(denial);
            return ctx.finish(&state, redirect).await;
        }
    };

    location.apply_update(form.into());
    match state.store.update_location(location).await {
        Ok(location) => {
            info!(location_id = %location.id, "Location updated");
            ctx.success("Location updated successfully!");
            ctx.finish(&state, Redirect::to(&format!("/locations/{}", location.id)))
                .await
        }
        Err(e) => {
            error!(location_id = %id, error = %e, "Failed to update location");
            ctx.error("Could not update location");
            ctx.finish(&state, Redirect::to("/locations")).await
        }
    }
}

/// `DELETE /locations/{id}`
pub async fn delete<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Path(id): Path<String>,
) -> Response {
    let location = match owned_location(&state.store, &ctx, &id).await {
        Ok(location) => location,
        Err(denial) => {
            let redirect = ctx.deny(denial);
            return ctx.finish(&state, redirect).await;
        }
    };

    match state.store.delete_location(location.id).await {
        Ok(()) => {
            info!(location_id = %location.id, "Location deleted");
            ctx.success("Location deleted successfully!");
        }
        Err(e) => {
            error!(location_id = %location.id, error = %e, "Failed to delete location");
            ctx.error("Could not delete location");
        }
    }
    ctx.finish(&state, Redirect::to("/locations")).await
}

async fn toggle_like<S: LocationStore>(
    store: &S,
    id: &str,
    user_id: Uuid,
) -> ServerResult<(Uuid, LikeOutcome)> {
    let not_found = || ServerError::NotFound(LOCATION_NOT_FOUND.to_string());
    let like_failed = |e: location_store::StoreError| {
        error!(location_id = %id, error = %e, "Failed to update likes");
        ServerError::Internal(LIKE_FAILED_MESSAGE.to_string())
    };

    let location_id = parse_id(id).ok_or_else(not_found)?;
    let mut location = store
        .get_location(location_id)
        .await
        .map_err(like_failed)?
        .ok_or_else(not_found)?;

    let outcome = location.toggle_like(user_id);
    store.update_location(location).await.map_err(like_failed)?;

    debug!(location_id = %location_id, user_id = %user_id, liked = outcome.liked, "Like toggled");
    Ok((location_id, outcome))
}

/// `POST /locations/{id}/like`
pub async fn like<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
    Path(id): Path<String>,
) -> Response {
    let mode = ctx.mode;

    let Ok(user) = ctx.require_user() else {
        if mode == ResponseMode::Json {
            return ServerError::AuthenticationRequired.into_response();
        }
        let redirect = ctx.deny(Denial::Unauthenticated);
        return ctx.finish(&state, redirect).await;
    };

    match (toggle_like(&state.store, &id, user.id).await, mode) {
        (Ok((_, outcome)), ResponseMode::Json) => Json(outcome).into_response(),
        (Ok((location_id, _)), ResponseMode::Redirect) => {
            ctx.finish(&state, Redirect::to(&format!("/locations/{location_id}")))
                .await
        }
        (Err(e), ResponseMode::Json) => e.into_response(),
        (Err(e), ResponseMode::Redirect) => {
            ctx.error(e.message());
            ctx.finish(&state, Redirect::to("/locations")).await
        }
    }
}

struct UploadedImage {
    bytes: Vec<u8>,
    file_name: Option<String>,
    content_type: String,
}

fn multipart_error(e: MultipartError) -> MediaError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        MediaError::TooLarge {
            size: UPLOAD_BODY_LIMIT,
        }
    } else {
        debug!(error = %e, "Malformed upload body");
        MediaError::NoFile
    }
}

async fn read_image_field(mut multipart: Multipart) -> MediaResult<UploadedImage> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(MediaError::NoFile);
        }
        check_image(&content_type, bytes.len())?;

        return Ok(UploadedImage {
            bytes: bytes.to_vec(),
            file_name,
            content_type,
        });
    }

    Err(MediaError::NoFile)
}

fn upload_error(e: MediaError) -> ServerError {
    if e.is_invalid_file() {
        ServerError::InvalidRequest(e.to_string())
    } else if e.is_auth_failure() {
        error!(error = %e, "ImageKit rejected credentials");
        ServerError::PermissionDenied(IMAGEKIT_AUTH_HINT.to_string())
    } else {
        error!(error = %e, "ImageKit upload error");
        ServerError::Internal(UPLOAD_FAILED_MESSAGE.to_string())
    }
}

/// `POST /locations/upload-image`
pub async fn upload_image<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    ctx: RequestContext,
    multipart: Multipart,
) -> ServerResult<Json<serde_json::Value>> {
    let user = ctx
        .user()
        .cloned()
        .ok_or(ServerError::AuthenticationRequired)?;

    let image = read_image_field(multipart).await.map_err(upload_error)?;
    let url = state
        .images
        .upload(image.bytes, image.file_name.as_deref(), &image.content_type)
        .await
        .map_err(upload_error)?;

    info!(user_id = %user.id, url = %url, "Location image uploaded");
    Ok(Json(json!({ "url": url })))
}

/// `POST /locations/extract-image-from-link`
pub async fn extract_image_from_link<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    ctx: RequestContext,
    JsonOrForm(request): JsonOrForm<ExtractImageRequest>,
) -> ServerResult<Json<serde_json::Value>> {
    if ctx.user().is_none() {
        return Err(ServerError::AuthenticationRequired);
    }

    let image_url = state.links.extract(&request.url).await.map_err(|e| {
        match &e {
            ExtractError::Fetch(detail) => error!(error = %detail, "Extract image error"),
            other => debug!(error = %other, "Link image extraction refused"),
        }
        ServerError::InvalidRequest(e.to_string())
    })?;

    Ok(Json(json!({ "imageUrl": image_url })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_form_keeps_missing_fields_unset() {
        let update: LocationUpdate = EditLocationForm {
            name: Some("Petra".to_string()),
            ..Default::default()
        }
        .into();

        assert_eq!(update.name.as_deref(), Some("Petra"));
        assert!(update.image.is_none());
        assert!(update.description.is_none());
    }

    #[test]
    fn test_upload_error_status() {
        assert_eq!(upload_error(MediaError::NoFile).status(), StatusCode::BAD_REQUEST);

        let forbidden = upload_error(MediaError::Provider {
            status: 403,
            message: "Forbidden".to_string(),
        });
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(forbidden.message(), IMAGEKIT_AUTH_HINT);

        let failed = upload_error(MediaError::NotConfigured);
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.message(), UPLOAD_FAILED_MESSAGE);
    }
}
