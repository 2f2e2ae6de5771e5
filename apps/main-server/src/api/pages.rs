//! Static pages.

use axum::{Json, extract::State, response::Response};
use location_store::LocationStore;
use serde_json::json;

use crate::middleware::RequestContext;
use crate::state::SharedState;

/// `GET /`
pub async fn landing<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
) -> Response {
    let page = ctx.render("landing", json!({}));
    ctx.finish(&state, Json(page)).await
}

/// `GET /register`
pub async fn register_form<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
) -> Response {
    let page = ctx.render("register", json!({}));
    ctx.finish(&state, Json(page)).await
}

/// `GET /login`
pub async fn login_form<S: LocationStore + 'static>(
    State(state): State<SharedState<S>>,
    mut ctx: RequestContext,
) -> Response {
    let page = ctx.render("login", json!({}));
    ctx.finish(&state, Json(page)).await
}
