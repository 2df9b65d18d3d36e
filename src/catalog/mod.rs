//! Device catalog
//!
//! - `memory`: in-process catalog store
//! - `sync`: derive catalog entries from a lock refresh result

pub mod memory;
pub mod sync;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::CatalogError;
use crate::gluehome::{Lock, DEVICE_MANUFACTURER, DOMAIN};

pub use memory::InMemoryCatalog;
pub use sync::{prune_catalog, sync_catalog};

/// Unified device record keyed by (namespace, identifier)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceEntry {
    pub namespace: String,
    pub identifier: String,
    pub config_entry_id: String,
    pub manufacturer: String,
    pub name: String,
    pub model: String,
    pub firmware_version: Option<String>,
}

impl DeviceEntry {
    pub fn from_lock(lock: &Lock, config_entry_id: &str) -> Self {
        Self {
            namespace: DOMAIN.to_string(),
            identifier: lock.id.clone(),
            config_entry_id: config_entry_id.to_string(),
            manufacturer: DEVICE_MANUFACTURER.to_string(),
            name: lock.description.clone(),
            model: lock.model.clone(),
            firmware_version: lock.firmware_version.clone(),
        }
    }
}

/// Stored entry with bookkeeping timestamps
#[derive(Debug, Clone, Serialize)]
pub struct CatalogRecord {
    #[serde(flatten)]
    pub entry: DeviceEntry,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Registry the integration publishes its devices into
#[async_trait]
pub trait DeviceCatalog: Send + Sync {
    /// Create or update the entry keyed by (namespace, identifier)
    async fn upsert(&self, entry: DeviceEntry) -> Result<UpsertOutcome, CatalogError>;

    async fn get(&self, namespace: &str, identifier: &str) -> Option<CatalogRecord>;

    async fn list(&self) -> Vec<CatalogRecord>;

    /// Returns true if an entry was removed
    async fn remove(&self, namespace: &str, identifier: &str) -> bool;
}
