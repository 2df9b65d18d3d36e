//! Lock list source for the refresh coordinator

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::UpdateError;
use crate::gluehome::{Lock, LocksApi};
use crate::refresh::UpdateSource;

/// Classifies API failures: invalid auth is fatal, everything else transient
pub struct LockSource {
    api: Arc<dyn LocksApi>,
}

impl LockSource {
    pub fn new(api: Arc<dyn LocksApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl UpdateSource<Vec<Lock>> for LockSource {
    async fn fetch(&self) -> Result<Vec<Lock>, UpdateError> {
        match self.api.list_locks().await {
            Ok(locks) => Ok(locks),
            Err(e) if e.is_auth_error() => {
                tracing::error!("[GlueHome] Failed to authenticate with API key to Glue Home");
                Err(UpdateError::Fatal(e.to_string()))
            }
            Err(e) => Err(UpdateError::Transient(format!(
                "Error communicating with API: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GlueHomeError;
    use crate::integration::tests::{front_door, FakeApi};

    #[tokio::test]
    async fn test_classification() {
        let api = FakeApi::new(
            vec![
                Err(GlueHomeError::InvalidAuth),
                Err(GlueHomeError::Decode("not json".to_string())),
            ],
            front_door(),
        );
        let source = LockSource::new(api);

        assert!(source.fetch().await.unwrap_err().is_fatal());

        let err = source.fetch().await.unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.to_string().starts_with("Error communicating with API"));

        assert_eq!(source.fetch().await.unwrap(), front_door());
    }
}
