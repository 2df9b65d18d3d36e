//! Lock platform: one lock entity per Glue lock

use serde_json::{json, Map, Value};

use super::{object_ids, Entity, EntityPlatform, Platform};
use crate::error::AppError;
use crate::gluehome::{Lock, LockOperation};
use crate::integration::Integration;

#[derive(Debug, Clone, Copy, Default)]
pub struct LockPlatform;

impl LockPlatform {
    pub fn unique_id(lock: &Lock) -> String {
        format!("{}_lock", lock.id)
    }

    fn state(lock: &Lock) -> &'static str {
        match lock.is_locked() {
            Some(true) => "locked",
            Some(false) => "unlocked",
            None => "unknown",
        }
    }
}

impl EntityPlatform for LockPlatform {
    fn platform(&self) -> Platform {
        Platform::Lock
    }

    fn entities(&self, locks: &[Lock], healthy: bool) -> Vec<Entity> {
        locks
            .iter()
            .zip(object_ids(locks))
            .map(|(lock, object_id)| {
                let mut attributes = Map::new();
                attributes.insert(
                    "connection_status".to_string(),
                    json!(lock.connection_status),
                );
                if let Some(event) = &lock.last_lock_event {
                    attributes.insert("last_event".to_string(), json!(event.event_type.as_str()));
                    attributes.insert(
                        "last_event_time".to_string(),
                        event
                            .event_time
                            .map(|t| Value::String(t.to_rfc3339()))
                            .unwrap_or(Value::Null),
                    );
                }

                Entity {
                    unique_id: Self::unique_id(lock),
                    entity_id: format!("lock.{}", object_id),
                    platform: Platform::Lock,
                    device_identifier: lock.id.clone(),
                    name: lock.description.clone(),
                    state: Self::state(lock).to_string(),
                    unit: None,
                    available: healthy && !lock.is_offline(),
                    attributes,
                }
            })
            .collect()
    }
}

/// Send a lock/unlock operation, then refresh so entities pick up the new state
pub async fn set_locked(
    integration: &Integration,
    lock_id: &str,
    operation: LockOperation,
) -> Result<(), AppError> {
    let known = integration
        .coordinator
        .data()
        .is_some_and(|locks| locks.iter().any(|l| l.id == lock_id));
    if !known {
        return Err(AppError::NotFound(format!("Lock {} not found", lock_id)));
    }

    integration.api.operate(lock_id, operation).await?;

    if let Err(e) = integration.coordinator.refresh().await {
        tracing::warn!(
            "[Platform] Refresh after {} of {} failed: {}",
            operation.as_str(),
            lock_id,
            e
        );
    }

    Ok(())
}
