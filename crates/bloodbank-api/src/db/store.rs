//! Postgres implementation of the engine's storage traits.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use bloodbank_core::{InventoryKey, RequestId};
use bloodbank_engine::{
    bounded, InventoryEntry, InventoryStore, RequestStore, StoreError, StoreFuture,
};
use bloodbank_state::{BloodRequest, RequestStatus};

use super::{inventory, requests};

/// Storage backed by a Postgres pool. Every call is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    /// Wrap a connected pool.
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Classify a driver error for the engine.
fn store_error(op: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } => StoreError::Corrupt {
            op,
            reason: err.to_string(),
        },
        sqlx::Error::PoolTimedOut => StoreError::Timeout {
            op,
            after: Duration::ZERO,
        },
        other => {
            tracing::error!(op, error = %other, "storage operation failed");
            StoreError::Unavailable {
                op,
                reason: other.to_string(),
            }
        }
    }
}

impl InventoryStore for PgStore {
    fn get_entry(&self, key: InventoryKey) -> StoreFuture<'_, Option<InventoryEntry>> {
        Box::pin(bounded(self.timeout, "get_entry", async move {
            inventory::get(&self.pool, key)
                .await
                .map_err(|e| store_error("get_entry", e))
        }))
    }

    fn apply_delta(
        &self,
        key: InventoryKey,
        delta: i64,
    ) -> StoreFuture<'_, Option<InventoryEntry>> {
        Box::pin(bounded(self.timeout, "apply_delta", async move {
            inventory::apply_delta(&self.pool, key, delta, Utc::now())
                .await
                .map_err(|e| store_error("apply_delta", e))
        }))
    }

    fn list_entries(&self) -> StoreFuture<'_, Vec<InventoryEntry>> {
        Box::pin(bounded(self.timeout, "list_entries", async move {
            inventory::list(&self.pool)
                .await
                .map_err(|e| store_error("list_entries", e))
        }))
    }
}

impl RequestStore for PgStore {
    fn insert_request<'a>(&'a self, request: &'a BloodRequest) -> StoreFuture<'a, ()> {
        Box::pin(bounded(self.timeout, "insert_request", async move {
            requests::insert(&self.pool, request)
                .await
                .map_err(|e| store_error("insert_request", e))
        }))
    }

    fn get_request(&self, id: RequestId) -> StoreFuture<'_, Option<BloodRequest>> {
        Box::pin(bounded(self.timeout, "get_request", async move {
            requests::get_by_id(&self.pool, id)
                .await
                .map_err(|e| store_error("get_request", e))
        }))
    }

    fn list_requests(&self) -> StoreFuture<'_, Vec<BloodRequest>> {
        Box::pin(bounded(self.timeout, "list_requests", async move {
            requests::list(&self.pool)
                .await
                .map_err(|e| store_error("list_requests", e))
        }))
    }

    fn update_request<'a>(
        &'a self,
        request: &'a BloodRequest,
        expected: RequestStatus,
    ) -> StoreFuture<'a, bool> {
        Box::pin(bounded(self.timeout, "update_request", async move {
            requests::update(&self.pool, request, expected)
                .await
                .map_err(|e| store_error("update_request", e))
        }))
    }
}
