//! Lock handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::SuccessResponse;
use crate::api::AppState;
use crate::error::AppError;
use crate::gluehome::Lock;

#[derive(Serialize)]
pub struct LocksResponse<'a> {
    pub refreshed_at: DateTime<Utc>,
    pub last_update_success: bool,
    pub locks: &'a [Lock],
}

/// GET /api/locks - Current refresh result
pub async fn list_locks(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let coordinator = &state.integration.coordinator;
    let snapshot = coordinator
        .snapshot()
        .ok_or_else(|| AppError::Unavailable("No lock data yet".to_string()))?;

    let body = serde_json::to_value(LocksResponse {
        refreshed_at: snapshot.refreshed_at,
        last_update_success: coordinator.last_update_success(),
        locks: &snapshot.data,
    })
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(Json(body))
}

/// GET /api/locks/:id - Single lock from the current result
pub async fn get_lock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let lock = state
        .integration
        .coordinator
        .data()
        .and_then(|locks| locks.iter().find(|l| l.id == id).cloned())
        .ok_or_else(|| AppError::NotFound(format!("Lock {} not found", id)))?;

    Ok(Json(lock))
}

/// POST /api/locks/:id/lock
pub async fn lock_lock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.integration.lock(&id).await?;
    Ok(Json(SuccessResponse::new(format!("Lock {} locked", id))))
}

/// POST /api/locks/:id/unlock
pub async fn unlock_lock(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.integration.unlock(&id).await?;
    Ok(Json(SuccessResponse::new(format!("Lock {} unlocked", id))))
}

/// POST /api/refresh - Manual refresh
pub async fn trigger_refresh(State(state): State<AppState>) -> Json<serde_json::Value> {
    match state.integration.coordinator.refresh().await {
        Ok(locks) => Json(serde_json::json!({
            "ok": true,
            "lock_count": locks.len(),
        })),
        Err(e) => Json(serde_json::json!({
            "ok": false,
            "fatal": e.is_fatal(),
            "error": e.to_string(),
        })),
    }
}
