//! BuenaVista Server binary.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use auth::{MemorySessionStore, SessionStore};
use axum::{ServiceExt, extract::Request};
use buenavista_server::{config::Config, create_app, create_state, init_tracing};
use location_store::MemoryLocationStore;
use tokio::signal;
use tracing::{debug, error, info};

/// How often expired sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    info!(
        environment = %config.environment,
        app_url = %config.app_url,
        "Starting BuenaVista Server"
    );

    let store = MemoryLocationStore::new();
    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    spawn_session_sweeper(Arc::clone(&sessions));

    let addr: SocketAddr = config.server_addr().parse()?;
    let state = create_state(config, store, sessions);
    let app = create_app(state);

    info!(addr = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn spawn_session_sweeper(sessions: Arc<dyn SessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match sessions.cleanup_expired().await {
                Ok(removed) => debug!(removed, "Swept expired sessions"),
                Err(e) => error!(error = %e, "Failed to sweep expired sessions"),
            }
        }
    });
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
