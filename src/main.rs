//! Logistics Dashboard - Axum Server

use std::net::SocketAddr;
use std::sync::Arc;

use logistics_dashboard::api::{create_router, AppState};
use logistics_dashboard::config::{AppConfig, ConfigError};
use logistics_dashboard::{console, demo_data};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "logistics_dashboard=info,tower_http=info";

/// Startup failures.
#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        error!(error = %e, "Server stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let config = AppConfig::from_env()?;
    if config.console {
        console::print_banner();
    }

    let state = Arc::new(AppState::from_config(&config));
    if config.seed_demo {
        demo_data::seed(&state.store);
    }
    if config.console {
        let store = &state.store;
        console::print_store_summary(store.shops.len(), store.drivers.len(), store.routes.len(), store.targets.len());
    }

    let app = create_router(state);
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(%addr, "Server listening on http://{addr}");
    axum::serve(listener, app).await.map_err(ServerError::Serve)
}
