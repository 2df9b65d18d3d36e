//! Catalog synchronization from a lock refresh result

use std::collections::HashSet;

use super::{DeviceCatalog, DeviceEntry, UpsertOutcome};
use crate::error::CatalogError;
use crate::gluehome::{Lock, DOMAIN};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Upsert one entry per lock; the first failure aborts the whole sync
pub async fn sync_catalog(
    catalog: &dyn DeviceCatalog,
    config_entry_id: &str,
    locks: &[Lock],
) -> Result<SyncReport, CatalogError> {
    let mut report = SyncReport::default();

    for lock in locks {
        tracing::debug!("[Catalog] Processing lock: {} ({})", lock.id, lock.description);

        let outcome = catalog
            .upsert(DeviceEntry::from_lock(lock, config_entry_id))
            .await
            .map_err(|e| {
                tracing::error!("[Catalog] Error registering device {}: {}", lock.id, e);
                e
            })?;

        match outcome {
            UpsertOutcome::Created => report.created += 1,
            UpsertOutcome::Updated => report.updated += 1,
            UpsertOutcome::Unchanged => report.unchanged += 1,
        }
    }

    Ok(report)
}

/// Remove this config entry's devices that are no longer reported
pub async fn prune_catalog(
    catalog: &dyn DeviceCatalog,
    config_entry_id: &str,
    locks: &[Lock],
) -> usize {
    let current: HashSet<&str> = locks.iter().map(|l| l.id.as_str()).collect();
    let mut removed = 0usize;

    for record in catalog.list().await {
        let entry = &record.entry;
        if entry.namespace != DOMAIN
            || entry.config_entry_id != config_entry_id
            || current.contains(entry.identifier.as_str())
        {
            continue;
        }

        if catalog.remove(&entry.namespace, &entry.identifier).await {
            tracing::info!("[Catalog] Removed stale device {}", entry.identifier);
            removed += 1;
        }
    }

    removed
}
