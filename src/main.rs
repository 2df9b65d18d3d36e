//! gluehome-bridge - Glue Home smart-lock bridge
//!
//! Polls the Glue Home cloud API for lock state, keeps a device catalog in
//! sync with the discovered locks, and exposes lock and sensor entities over
//! a small HTTP API.

mod api;
mod catalog;
mod config;
mod error;
mod gluehome;
mod integration;
mod platforms;
mod refresh;

use std::net::SocketAddr;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::catalog::InMemoryCatalog;
use crate::integration::ConfigEntry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gluehome_bridge=info,tower_http=debug".into()),
        )
        .init();

    tracing::info!("Starting gluehome-bridge...");

    // Load configuration
    let config = config::Config::load()?;
    tracing::info!("Configuration loaded");

    let entry = ConfigEntry::from_account(&config.account);
    let api = integration::initialize(&entry, &config.gluehome)?;
    let catalog = Arc::new(InMemoryCatalog::new());

    let integration = integration::setup_with_retry(&entry, api, catalog, &config.refresh).await?;
    let integration = Arc::new(integration);
    tracing::info!("Glue Home entry {} set up", entry.entry_id);

    // Build application router
    let app = api::routes(AppState::new(Arc::clone(&integration))).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    integration.shutdown().await;
    tracing::info!("gluehome-bridge stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
