//! API module - HTTP handlers and routes

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::integration::Integration;

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub integration: Arc<Integration>,
}

impl AppState {
    pub fn new(integration: Arc<Integration>) -> Self {
        Self { integration }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check))
        // Locks
        .route("/api/locks", get(handlers::list_locks))
        .route("/api/locks/:id", get(handlers::get_lock))
        .route("/api/locks/:id/lock", post(handlers::lock_lock))
        .route("/api/locks/:id/unlock", post(handlers::unlock_lock))
        .route("/api/refresh", post(handlers::trigger_refresh))
        // Device catalog and entities
        .route("/api/devices", get(handlers::list_devices))
        .route("/api/entities", get(handlers::list_entities))
        .route("/api/entities/:unique_id", get(handlers::get_entity))
        .with_state(state)
}
