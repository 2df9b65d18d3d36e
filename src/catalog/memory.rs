//! In-memory device catalog

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{CatalogRecord, DeviceCatalog, DeviceEntry, UpsertOutcome};
use crate::error::CatalogError;

type CatalogKey = (String, String);

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    entries: RwLock<BTreeMap<CatalogKey, CatalogRecord>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceCatalog for InMemoryCatalog {
    async fn upsert(&self, entry: DeviceEntry) -> Result<UpsertOutcome, CatalogError> {
        if entry.namespace.is_empty() {
            return Err(CatalogError::InvalidEntry("empty namespace".to_string()));
        }
        if entry.identifier.trim().is_empty() {
            return Err(CatalogError::InvalidEntry(format!(
                "empty identifier for device '{}'",
                entry.name
            )));
        }

        let key = (entry.namespace.clone(), entry.identifier.clone());
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        match entries.get_mut(&key) {
            Some(record) if record.entry == entry => Ok(UpsertOutcome::Unchanged),
            Some(record) => {
                record.entry = entry;
                record.updated_at = now;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                entries.insert(
                    key,
                    CatalogRecord {
                        entry,
                        created_at: now,
                        updated_at: now,
                    },
                );
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn get(&self, namespace: &str, identifier: &str) -> Option<CatalogRecord> {
        let key = (namespace.to_string(), identifier.to_string());
        self.entries.read().await.get(&key).cloned()
    }

    async fn list(&self) -> Vec<CatalogRecord> {
        self.entries.read().await.values().cloned().collect()
    }

    async fn remove(&self, namespace: &str, identifier: &str) -> bool {
        let key = (namespace.to_string(), identifier.to_string());
        self.entries.write().await.remove(&key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gluehome::Lock;

    #[tokio::test]
    async fn test_upsert_outcomes() {
        let catalog = InMemoryCatalog::new();
        let mut entry = DeviceEntry::from_lock(&Lock::new("L1", "Front Door"), "entry-1");

        assert_eq!(catalog.upsert(entry.clone()).await.unwrap(), UpsertOutcome::Created);
        assert_eq!(catalog.upsert(entry.clone()).await.unwrap(), UpsertOutcome::Unchanged);

        entry.firmware_version = Some("2.0".to_string());
        assert_eq!(catalog.upsert(entry).await.unwrap(), UpsertOutcome::Updated);
        assert_eq!(catalog.list().await.len(), 1);

        let record = catalog.get("gluehome", "L1").await.unwrap();
        assert_eq!(record.entry.firmware_version.as_deref(), Some("2.0"));
        assert!(record.updated_at >= record.created_at);
    }

    #[tokio::test]
    async fn test_rejects_empty_identifier() {
        let catalog = InMemoryCatalog::new();
        let entry = DeviceEntry::from_lock(&Lock::new("", "Ghost"), "entry-1");

        let err = catalog.upsert(entry).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidEntry(_)));
        assert_eq!(catalog.list().await.len(), 0);
    }

    #[tokio::test]
    async fn test_remove() {
        let catalog = InMemoryCatalog::new();
        let entry = DeviceEntry::from_lock(&Lock::new("L1", "Front Door"), "entry-1");
        catalog.upsert(entry).await.unwrap();

        assert!(catalog.remove("gluehome", "L1").await);
        assert!(!catalog.remove("gluehome", "L1").await);
        assert!(catalog.list().await.is_empty());
    }
}
