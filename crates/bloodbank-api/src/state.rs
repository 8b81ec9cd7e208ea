//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! The state carries no domain data of its own. Requests and inventory
//! live behind the [`LifecycleController`], which owns the storage
//! backend picked at startup: Postgres when a pool is supplied, the
//! in-memory store otherwise.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;

use bloodbank_engine::{InventoryLedger, InventoryStore, LifecycleController, MemoryStore, RequestStore};

use crate::config::{AppConfig, DEFAULT_STORAGE_TIMEOUT};
use crate::db::PgStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Request lifecycle and inventory operations.
    pub controller: Arc<LifecycleController>,
    /// Postgres pool, when persistence is configured. Probed by readiness.
    pub db_pool: Option<PgPool>,
    /// Prometheus renderer, when a recorder has been installed.
    pub metrics: Option<PrometheusHandle>,
    /// Limit applied to the readiness probe's database round trip.
    pub storage_timeout: Duration,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("controller", &self.controller)
            .field("persistent", &self.db_pool.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("storage_timeout", &self.storage_timeout)
            .finish()
    }
}

impl AppState {
    /// In-memory state with no metrics recorder.
    pub fn new() -> Self {
        Self::in_memory(MemoryStore::new())
    }

    /// State backed by an existing in-memory store.
    pub fn in_memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self::from_stores(store.clone(), store, None, DEFAULT_STORAGE_TIMEOUT)
    }

    /// State backed by Postgres.
    pub fn with_postgres(pool: PgPool, storage_timeout: Duration) -> Self {
        let store = Arc::new(PgStore::new(pool.clone(), storage_timeout));
        Self::from_stores(store.clone(), store, Some(pool), storage_timeout)
    }

    /// Pick the backend from configuration: Postgres when `pool` is set.
    pub fn from_config(config: &AppConfig, pool: Option<PgPool>) -> Self {
        match pool {
            Some(pool) => Self::with_postgres(pool, config.storage_timeout),
            None => Self {
                storage_timeout: config.storage_timeout,
                ..Self::new()
            },
        }
    }

    /// Attach a Prometheus renderer for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    fn from_stores(
        inventory: Arc<dyn InventoryStore>,
        requests: Arc<dyn RequestStore>,
        db_pool: Option<PgPool>,
        storage_timeout: Duration,
    ) -> Self {
        let ledger = Arc::new(InventoryLedger::new(inventory));
        Self {
            controller: Arc::new(LifecycleController::new(requests, ledger)),
            db_pool,
            metrics: None,
            storage_timeout,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
