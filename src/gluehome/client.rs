//! Glue Home HTTP API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

use super::models::{Lock, LockOperation, LockResponse};
use crate::config::GlueHomeConfig;
use crate::error::{GlueHomeError, SetupError};

/// Operations the bridge needs from the lock vendor
#[async_trait]
pub trait LocksApi: Send + Sync {
    /// List every lock registered to the account, in API order
    async fn list_locks(&self) -> Result<Vec<Lock>, GlueHomeError>;

    /// Send a lock/unlock operation to one lock
    async fn operate(&self, lock_id: &str, operation: LockOperation) -> Result<(), GlueHomeError>;
}

/// API client bound to a single account key
pub struct GlueHomeClient {
    base_url: String,
    api_key: String,
    http_client: Client,
}

impl std::fmt::Debug for GlueHomeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlueHomeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GlueHomeClient {
    /// Bind a client to `api_key`; an empty key is a configuration error
    pub fn initialize(api_key: &str, config: &GlueHomeConfig) -> Result<Self, SetupError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(SetupError::Configuration(
                "Glue Home API key is empty".to_string(),
            ));
        }

        let parsed = url::Url::parse(&config.base_url).map_err(|e| {
            SetupError::Configuration(format!("Invalid base URL {}: {}", config.base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SetupError::Configuration(format!(
                "Unsupported base URL scheme: {}",
                parsed.scheme()
            )));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SetupError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http_client,
        })
    }

    fn auth_header(&self) -> String {
        format!("Api-Key {}", self.api_key)
    }

    /// Map non-success statuses onto the error taxonomy
    async fn check_status(resp: Response) -> Result<Response, GlueHomeError> {
        match resp.status() {
            status if status.is_success() => Ok(resp),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GlueHomeError::InvalidAuth),
            status => {
                let message = resp.text().await.unwrap_or_default();
                Err(GlueHomeError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl LocksApi for GlueHomeClient {
    async fn list_locks(&self) -> Result<Vec<Lock>, GlueHomeError> {
        let url = format!("{}/v1/locks", self.base_url);
        tracing::trace!("[GlueHome] GET {}", url);

        let resp = self
            .http_client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;

        let raw: Vec<LockResponse> = resp
            .json()
            .await
            .map_err(|e| GlueHomeError::Decode(format!("lock list: {}", e)))?;

        Ok(raw.into_iter().map(Lock::from).collect())
    }

    async fn operate(&self, lock_id: &str, operation: LockOperation) -> Result<(), GlueHomeError> {
        let url = format!("{}/v1/locks/{}/operations", self.base_url, lock_id);
        tracing::info!("[GlueHome] {} lock {}", operation.as_str(), lock_id);

        let resp = self
            .http_client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&serde_json::json!({ "type": operation }))
            .send()
            .await?;
        Self::check_status(resp).await?;

        Ok(())
    }
}
