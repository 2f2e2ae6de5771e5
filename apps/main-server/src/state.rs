//! Application state.

use std::sync::Arc;

use auth::SessionStore;
use location_store::LocationStore;
use mailer::Mailer;
use media::{ImageKitClient, LinkImageExtractor};

use crate::config::Config;

/// Shared application state.
pub struct AppState<S: LocationStore> {
    /// Server configuration.
    pub config: Config,
    /// Users, locations and comments.
    pub store: S,
    /// Session records.
    pub sessions: Arc<dyn SessionStore>,
    /// Transactional email.
    pub mailer: Mailer,
    /// Image uploads and display URLs.
    pub images: ImageKitClient,
    /// Preview image lookup for pasted links.
    pub links: LinkImageExtractor,
}

impl<S: LocationStore> AppState<S> {
    /// Creates new application state.
    pub fn new(config: Config, store: S, sessions: Arc<dyn SessionStore>) -> Self {
        let mailer = Mailer::from_api_key(config.resend_api_key.as_deref(), config.app_url.clone());
        let images = ImageKitClient::new(&config.imagekit);

        Self {
            config,
            store,
            sessions,
            mailer,
            images,
            links: LinkImageExtractor::new(),
        }
    }

    /// Replaces the mailer.
    pub fn with_mailer(mut self, mailer: Mailer) -> Self {
        self.mailer = mailer;
        self
    }

    /// Replaces the link image extractor.
    pub fn with_link_extractor(mut self, links: LinkImageExtractor) -> Self {
        self.links = links;
        self
    }
}

/// Type alias for shared state.
pub type SharedState<S> = Arc<AppState<S>>;

/// Creates shared state from config, store and session store.
pub fn create_shared_state<S: LocationStore>(
    config: Config,
    store: S,
    sessions: Arc<dyn SessionStore>,
) -> SharedState<S> {
    Arc::new(AppState::new(config, store, sessions))
}
