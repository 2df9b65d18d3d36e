//! Entity platforms
//!
//! Each platform turns the current lock snapshot into entities and publishes
//! them into the shared `EntityRegistry`. Platforms are forwarded once at
//! setup and keep themselves current by following coordinator updates.

pub mod lock;
pub mod sensor;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::gluehome::Lock;
use crate::integration::LockCoordinator;

pub use lock::LockPlatform;
pub use sensor::SensorPlatform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Lock,
    Sensor,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Lock, Platform::Sensor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Lock => "lock",
            Platform::Sensor => "sensor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub unique_id: String,
    pub entity_id: String,
    pub platform: Platform,
    pub device_identifier: String,
    pub name: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    pub available: bool,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Entities by unique id, replaced per platform
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: RwLock<BTreeMap<String, Entity>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every entity of `platform` with `entities`
    pub async fn publish(&self, platform: Platform, entities: Vec<Entity>) {
        let mut map = self.entities.write().await;
        map.retain(|_, e| e.platform != platform);
        for entity in entities {
            map.insert(entity.unique_id.clone(), entity);
        }
    }

    pub async fn get(&self, unique_id: &str) -> Option<Entity> {
        self.entities.read().await.get(unique_id).cloned()
    }

    pub async fn list(&self) -> Vec<Entity> {
        self.entities.read().await.values().cloned().collect()
    }

    pub async fn list_platform(&self, platform: Platform) -> Vec<Entity> {
        self.entities
            .read()
            .await
            .values()
            .filter(|e| e.platform == platform)
            .cloned()
            .collect()
    }
}

/// Builds the entities for one platform kind
pub trait EntityPlatform: Send + Sync {
    fn platform(&self) -> Platform;

    /// `healthy` is false when the last refresh failed
    fn entities(&self, locks: &[Lock], healthy: bool) -> Vec<Entity>;
}

pub fn platform_for(kind: Platform) -> Arc<dyn EntityPlatform> {
    match kind {
        Platform::Lock => Arc::new(LockPlatform),
        Platform::Sensor => Arc::new(SensorPlatform),
    }
}

/// Spawn one setup task per platform; the caller tracks completion
pub fn forward_setups(
    platforms: &[Platform],
    coordinator: Arc<LockCoordinator>,
    registry: Arc<EntityRegistry>,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    platforms
        .iter()
        .map(|kind| {
            let platform = platform_for(*kind);
            tokio::spawn(run_platform(
                platform,
                Arc::clone(&coordinator),
                Arc::clone(&registry),
                shutdown.clone(),
            ))
        })
        .collect()
}

async fn run_platform(
    platform: Arc<dyn EntityPlatform>,
    coordinator: Arc<LockCoordinator>,
    registry: Arc<EntityRegistry>,
    mut shutdown: watch::Receiver<bool>,
) {
    let kind = platform.platform();
    // Status changes after every attempt, so availability follows failures too
    let mut updates = coordinator.subscribe_status();

    let entities = build_entities(platform.as_ref(), &coordinator);
    tracing::info!(
        "[Platform] Set up {} platform with {} entities",
        kind.as_str(),
        entities.len()
    );
    registry.publish(kind, entities).await;

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let entities = build_entities(platform.as_ref(), &coordinator);
        tracing::debug!(
            "[Platform] {} platform updated ({} entities)",
            kind.as_str(),
            entities.len()
        );
        registry.publish(kind, entities).await;
    }

    tracing::debug!("[Platform] {} platform stopped", kind.as_str());
}

fn build_entities(platform: &dyn EntityPlatform, coordinator: &LockCoordinator) -> Vec<Entity> {
    let locks = coordinator.data();
    let healthy = coordinator.last_update_success();
    platform.entities(locks.as_deref().map(Vec::as_slice).unwrap_or(&[]), healthy)
}

/// Object ids for entity ids, one per lock. Locks sharing a description
/// get their lock id appended so entity ids stay unique.
pub fn object_ids(locks: &[Lock]) -> Vec<String> {
    let slugs: Vec<String> = locks.iter().map(|l| slugify(&l.description)).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for slug in &slugs {
        *counts.entry(slug.as_str()).or_default() += 1;
    }

    slugs
        .iter()
        .zip(locks)
        .map(|(slug, lock)| {
            if counts.get(slug.as_str()).copied().unwrap_or(0) > 1 {
                format!("{}_{}", slug, slugify(&lock.id))
            } else {
                slug.clone()
            }
        })
        .collect()
}

/// Lowercase slug for entity ids ("Front Door" -> "front_door")
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Front Door"), "front_door");
        assert_eq!(slugify("  Back -- Door #2 "), "back_door_2");
        assert_eq!(slugify("Ärger"), "rger");
        assert_eq!(slugify("!!!"), "unnamed");
    }

    #[tokio::test]
    async fn test_publish_replaces_platform_only() {
        let registry = EntityRegistry::new();
        let locks = vec![Lock::new("L1", "Front Door")];

        registry
            .publish(Platform::Lock, LockPlatform.entities(&locks, true))
            .await;
        registry
            .publish(Platform::Sensor, SensorPlatform.entities(&locks, true))
            .await;
        assert_eq!(registry.list().await.len(), 3);

        registry.publish(Platform::Lock, Vec::new()).await;
        assert!(registry.list_platform(Platform::Lock).await.is_empty());
        assert_eq!(registry.list_platform(Platform::Sensor).await.len(), 2);
    }
}
