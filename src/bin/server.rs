//! PeopleChain document store server
//!
//! Serves the `/api/db` document store over HTTP. State is held in memory
//! for the lifetime of the process.
//!
//! # Configuration
//!
//! Environment variables:
//! - `PCDB_CONFIG`: Path to config file (default: ~/.config/peoplechain-db/config.yaml)
//! - `PCDB_HOST`: Address to bind (default: 0.0.0.0)
//! - `PCDB_PORT`: Port to listen on (default: 8081)
//! - `PCDB_DEFAULT_LIMIT`: Listing page size when `limit` is omitted (default: 50)
//! - `PCDB_MAX_LIMIT`: Largest listing page size (default: 500)
//! - `PCDB_MAX_BODY_BYTES`: Largest request body (default: 5 MiB)
//!
//! # Config File Format
//!
//! ```yaml
//! host: 127.0.0.1
//! port: 8081
//! default_limit: 50
//! max_limit: 500
//! max_body_bytes: 5242880
//! ```

use peoplechain_db::config::Config;
use peoplechain_db::server::{app, DocumentStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pcdb_server=info,peoplechain_db=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config_path = Config::default_config_path();
    tracing::info!("Config file: {}", config_path.display());
    let config = Config::load(Some(config_path))?;

    let limits = config.page_limits();
    tracing::info!(
        "Listing limits: default {}, max {}; body limit {} bytes",
        limits.default_limit,
        limits.max_limit,
        config.max_body_bytes
    );

    // Build the store and router
    let store = Arc::new(DocumentStore::new().with_limits(limits));
    let app = app(store, config.max_body_bytes);

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Starting server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
