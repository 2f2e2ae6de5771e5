//! BuenaVista Server
//!
//! Serves the location-sharing app: sessions and accounts, location posts
//! with likes and comments, image uploads and transactional email.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod state;

use std::sync::Arc;

use auth::SessionStore;
use axum::{Router, extract::Request};
use location_store::LocationStore;
use tower::{Layer, util::MapRequest, util::MapRequestLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::{SharedState, create_shared_state};

/// The application service: method override in front of the router.
pub type App = MapRequest<Router, fn(Request) -> Request>;

/// Creates the application with all routes configured.
///
/// Method override runs before routing so `POST ?_method=DELETE` reaches
/// the DELETE handler.
pub fn create_app<S: LocationStore + 'static>(state: SharedState<S>) -> App {
    let router = api::create_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    MapRequestLayer::new(middleware::method_override as fn(Request) -> Request).layer(router)
}

/// Creates the application state with the given configuration and stores.
pub fn create_state<S: LocationStore>(
    config: Config,
    store: S,
    sessions: Arc<dyn SessionStore>,
) -> SharedState<S> {
    let state = create_shared_state(config, store, sessions);
    if !state.mailer.is_configured() {
        tracing::warn!("RESEND_API_KEY not set; emails will be skipped");
    }
    if !state.images.is_configured() {
        tracing::warn!("ImageKit credentials not set; image uploads are disabled");
    }
    state
}

/// Initializes tracing with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
