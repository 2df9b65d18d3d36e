//! Device catalog and entity handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::AppState;
use crate::catalog::CatalogRecord;
use crate::error::AppError;
use crate::platforms::{Entity, Platform};

#[derive(Debug, Deserialize)]
pub struct EntityQuery {
    pub platform: Option<Platform>,
}

/// GET /api/devices - Catalog entries
pub async fn list_devices(State(state): State<AppState>) -> Json<Vec<CatalogRecord>> {
    Json(state.integration.catalog.list().await)
}

/// GET /api/entities - Lock and sensor entities, optionally filtered by platform
pub async fn list_entities(
    State(state): State<AppState>,
    Query(query): Query<EntityQuery>,
) -> Json<Vec<Entity>> {
    let entities = match query.platform {
        Some(platform) => state.integration.entities.list_platform(platform).await,
        None => state.integration.entities.list().await,
    };
    Json(entities)
}

/// GET /api/entities/:unique_id
pub async fn get_entity(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Json<Entity>, AppError> {
    state
        .integration
        .entities
        .get(&unique_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Entity {} not found", unique_id)))
}
