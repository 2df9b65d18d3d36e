//! Integration setup and lifecycle
//!
//! Setup order: validate the config entry, run the first fetch, register every
//! lock in the device catalog, then forward the entity platforms and start the
//! background tasks. Any fatal error before the catalog sync completes aborts
//! setup with nothing started.

mod source;

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time;

use crate::catalog::{prune_catalog, sync_catalog, DeviceCatalog};
use crate::config::{AccountConfig, GlueHomeConfig, RefreshConfig};
use crate::error::{AppError, SetupError};
use crate::gluehome::{GlueHomeClient, Lock, LockOperation, LocksApi, DOMAIN};
use crate::platforms::{self, EntityRegistry, Platform};
use crate::refresh::{RefreshCoordinator, RefreshPolicy};

pub use source::LockSource;

pub type LockCoordinator = RefreshCoordinator<Vec<Lock>>;

/// One configured account
#[derive(Clone)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub api_key: String,
}

impl std::fmt::Debug for ConfigEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigEntry")
            .field("entry_id", &self.entry_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ConfigEntry {
    pub fn new(entry_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_account(account: &AccountConfig) -> Self {
        let entry_id = account
            .entry_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        Self::new(entry_id, account.api_key.clone())
    }
}

/// Build the API client for an entry
pub fn initialize(
    entry: &ConfigEntry,
    config: &GlueHomeConfig,
) -> Result<Arc<dyn LocksApi>, SetupError> {
    let client = GlueHomeClient::initialize(&entry.api_key, config)?;
    Ok(Arc::new(client))
}

/// A set-up integration instance and its background tasks
pub struct Integration {
    pub entry: ConfigEntry,
    pub api: Arc<dyn LocksApi>,
    pub coordinator: Arc<LockCoordinator>,
    pub catalog: Arc<dyn DeviceCatalog>,
    pub entities: Arc<EntityRegistry>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Integration {
    pub async fn setup(
        entry: ConfigEntry,
        api: Arc<dyn LocksApi>,
        catalog: Arc<dyn DeviceCatalog>,
        policy: RefreshPolicy,
    ) -> Result<Self, SetupError> {
        tracing::info!("[Setup] Setting up Glue Home (entry {})", entry.entry_id);

        if entry.api_key.trim().is_empty() {
            return Err(SetupError::Configuration(
                "Glue Home API key is empty".to_string(),
            ));
        }

        tracing::info!("[Setup] Setting up locks for Glue Home");
        let source = Arc::new(LockSource::new(Arc::clone(&api)));
        let coordinator = Arc::new(LockCoordinator::new(DOMAIN, source, policy));

        let locks = coordinator.first_refresh().await?;
        tracing::info!("[Setup] Found {} Glue Home locks", locks.len());

        let report = sync_catalog(catalog.as_ref(), &entry.entry_id, &locks)
            .await
            .map_err(SetupError::CatalogSync)?;
        tracing::info!(
            "[Setup] Device catalog synced: {} created, {} updated, {} unchanged",
            report.created,
            report.updated,
            report.unchanged
        );

        let (shutdown, shutdown_rx) = watch::channel(false);
        let entities = Arc::new(EntityRegistry::new());

        let mut tasks = platforms::forward_setups(
            &Platform::ALL,
            Arc::clone(&coordinator),
            Arc::clone(&entities),
            shutdown_rx.clone(),
        );
        tasks.push(spawn_catalog_resync(
            entry.entry_id.clone(),
            Arc::clone(&coordinator),
            Arc::clone(&catalog),
            shutdown_rx.clone(),
        ));
        tasks.push(Arc::clone(&coordinator).start(shutdown_rx));

        Ok(Self {
            entry,
            api,
            coordinator,
            catalog,
            entities,
            shutdown,
            tasks: Mutex::new(tasks),
        })
    }

    pub async fn lock(&self, lock_id: &str) -> Result<(), AppError> {
        platforms::lock::set_locked(self, lock_id, LockOperation::Lock).await
    }

    pub async fn unlock(&self, lock_id: &str) -> Result<(), AppError> {
        platforms::lock::set_locked(self, lock_id, LockOperation::Unlock).await
    }

    /// Signal every background task to stop and wait for them
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                tracing::warn!("[Setup] Background task ended abnormally: {}", e);
            }
        }
        tracing::info!("[Setup] Glue Home entry {} unloaded", self.entry.entry_id);
    }
}

/// Keep the catalog aligned with every successful refresh
fn spawn_catalog_resync(
    entry_id: String,
    coordinator: Arc<LockCoordinator>,
    catalog: Arc<dyn DeviceCatalog>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    // The result published by the first refresh is already synced
    let mut updates = coordinator.subscribe();

    tokio::spawn(async move {
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

            let Some(locks) = updates
                .borrow_and_update()
                .as_ref()
                .map(|s| Arc::clone(&s.data))
            else {
                continue;
            };

            match sync_catalog(catalog.as_ref(), &entry_id, &locks).await {
                Ok(report) => {
                    let removed = prune_catalog(catalog.as_ref(), &entry_id, &locks).await;
                    if report.created + report.updated + removed > 0 {
                        tracing::info!(
                            "[Catalog] Resynced: {} created, {} updated, {} removed",
                            report.created,
                            report.updated,
                            removed
                        );
                    }
                }
                Err(e) => tracing::warn!("[Catalog] Resync failed: {}", e),
            }
        }
    })
}

/// Run setup, retrying transient first-fetch failures per the refresh config
pub async fn setup_with_retry(
    entry: &ConfigEntry,
    api: Arc<dyn LocksApi>,
    catalog: Arc<dyn DeviceCatalog>,
    refresh: &RefreshConfig,
) -> Result<Integration, SetupError> {
    let mut attempt = 0u32;
    let attempts_left = |attempt: u32| refresh.max_setup_attempts.map_or(true, |max| attempt < max);

    loop {
        attempt += 1;
        let result = Integration::setup(
            entry.clone(),
            Arc::clone(&api),
            Arc::clone(&catalog),
            RefreshPolicy::from(refresh),
        )
        .await;

        match result {
            Ok(integration) => return Ok(integration),
            Err(e) if e.is_retryable() && attempts_left(attempt) => {
                tracing::warn!(
                    "[Setup] Attempt {} failed: {}; retrying in {}s",
                    attempt,
                    e,
                    refresh.setup_retry_secs
                );
                time::sleep(refresh.setup_retry_delay()).await;
            }
            Err(e) => {
                tracing::error!(
                    "[Setup] Glue Home setup failed after {} attempt(s): {}",
                    attempt,
                    e
                );
                return Err(e);
            }
        }
    }
}
