//! HTTP handlers module

mod catalog;
mod locks;

pub use self::catalog::*;
pub use self::locks::*;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use super::AppState;
use crate::refresh::RefreshStatus;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub entry_id: String,
    pub lock_count: usize,
    pub refresh: RefreshStatus,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let integration = &state.integration;
    let refresh = integration.coordinator.status();
    let lock_count = integration
        .coordinator
        .data()
        .map(|locks| locks.len())
        .unwrap_or(0);

    Json(HealthResponse {
        status: refresh.state.as_str().to_string(),
        service: "gluehome-bridge".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        entry_id: integration.entry.entry_id.clone(),
        lock_count,
        refresh,
    })
}

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
