//! Error handling module

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Reasons the integration setup can fail
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Authentication rejected; setup must not be retried automatically
    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Update failed: {0}")]
    UpdateFailed(String),

    #[error("Device catalog sync failed: {0}")]
    CatalogSync(#[source] CatalogError),
}

impl SetupError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SetupError::UpdateFailed(_))
    }
}

impl From<UpdateError> for SetupError {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::Fatal(msg) => SetupError::NotReady(msg),
            UpdateError::Transient(msg) => SetupError::UpdateFailed(msg),
        }
    }
}

/// Outcome classification reported by an update source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("{0}")]
    Fatal(String),

    #[error("{0}")]
    Transient(String),
}

impl UpdateError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, UpdateError::Fatal(_))
    }
}

#[derive(Error, Debug)]
pub enum GlueHomeError {
    #[error("Invalid API key")]
    InvalidAuth,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl GlueHomeError {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, GlueHomeError::InvalidAuth)
    }
}

impl From<reqwest::Error> for GlueHomeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GlueHomeError::Decode(err.to_string())
        } else {
            GlueHomeError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Invalid device entry: {0}")]
    InvalidEntry(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<GlueHomeError> for AppError {
    fn from(err: GlueHomeError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}
