//! HTTP endpoints.

pub mod auth;
pub mod comments;
pub mod locations;
pub mod pages;
pub mod views;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use location_store::LocationStore;

use crate::state::SharedState;

/// Creates the router with all endpoints.
pub fn create_router<S: LocationStore + 'static>() -> Router<SharedState<S>> {
    Router::new()
        // Pages
        .route("/", get(pages::landing))
        // Auth endpoints
        .route("/register", get(pages::register_form).post(auth::register))
        .route("/login", get(pages::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        // Location endpoints
        .route("/locations", get(locations::index).post(locations::create))
        .route("/locations/new", get(locations::new_form))
        .route("/locations/api/likes", get(locations::api_likes))
        .route(
            "/locations/upload-image",
            post(locations::upload_image)
                .layer(DefaultBodyLimit::max(locations::UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/locations/extract-image-from-link",
            post(locations::extract_image_from_link),
        )
        .route(
            "/locations/{id}",
            get(locations::show)
                .put(locations::update)
                .patch(locations::update)
                .delete(locations::delete),
        )
        .route("/locations/{id}/edit", get(locations::edit_form))
        .route("/locations/{id}/like", post(locations::like))
        // Comment endpoints
        .route("/locations/{id}/comments", post(comments::create))
        .route("/locations/{id}/comments/new", get(comments::new_form))
        .route(
            "/locations/{id}/comments/{comment_id}",
            put(comments::update)
                .patch(comments::update)
                .delete(comments::delete),
        )
        .route(
            "/locations/{id}/comments/{comment_id}/edit",
            get(comments::edit_form),
        )
        // Health check
        .route("/health", get(health_check))
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
