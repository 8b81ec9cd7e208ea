//! # In-Memory Store
//!
//! Thread-safe, cloneable backend implementing both storage traits.
//!
//! All operations are synchronous under a `parking_lot` lock and never hold
//! it across an `.await`: each trait method computes its result up front
//! and returns an already-completed future. `parking_lot` locks are
//! non-poisonable, so a panicking writer does not wedge the store.
//!
//! Used when no database is configured, by the CLI dry run, and in tests.
//! State does not survive a restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use bloodbank_core::{InventoryKey, RequestId};
use bloodbank_state::{BloodRequest, RequestStatus};

use crate::ledger::InventoryEntry;
use crate::store::{InventoryStore, RequestStore, StoreFuture};

/// In-process inventory and request storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inventory: Arc<RwLock<BTreeMap<InventoryKey, InventoryEntry>>>,
    requests: Arc<RwLock<HashMap<RequestId, BloodRequest>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests.
    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }
}

impl InventoryStore for MemoryStore {
    fn get_entry(&self, key: InventoryKey) -> StoreFuture<'_, Option<InventoryEntry>> {
        let entry = self.inventory.read().get(&key).cloned();
        Box::pin(std::future::ready(Ok(entry)))
    }

    fn apply_delta(
        &self,
        key: InventoryKey,
        delta: i64,
    ) -> StoreFuture<'_, Option<InventoryEntry>> {
        let mut inventory = self.inventory.write();
        let current = inventory.get(&key).map_or(0, |entry| entry.units);
        let next = i64::from(current)
            .checked_add(delta)
            .and_then(|n| u32::try_from(n).ok());

        let result = next.map(|units| {
            let entry = InventoryEntry {
                bank_id: key.bank_id,
                blood_group: key.blood_group,
                units,
                updated_at: Utc::now(),
            };
            inventory.insert(key, entry.clone());
            entry
        });
        Box::pin(std::future::ready(Ok(result)))
    }

    fn list_entries(&self) -> StoreFuture<'_, Vec<InventoryEntry>> {
        let entries = self.inventory.read().values().cloned().collect();
        Box::pin(std::future::ready(Ok(entries)))
    }
}

impl RequestStore for MemoryStore {
    fn insert_request<'a>(&'a self, request: &'a BloodRequest) -> StoreFuture<'a, ()> {
        self.requests.write().insert(request.id, request.clone());
        Box::pin(std::future::ready(Ok(())))
    }

    fn get_request(&self, id: RequestId) -> StoreFuture<'_, Option<BloodRequest>> {
        let request = self.requests.read().get(&id).cloned();
        Box::pin(std::future::ready(Ok(request)))
    }

    fn list_requests(&self) -> StoreFuture<'_, Vec<BloodRequest>> {
        let requests = self.requests.read().values().cloned().collect();
        Box::pin(std::future::ready(Ok(requests)))
    }

    fn update_request<'a>(
        &'a self,
        request: &'a BloodRequest,
        expected: RequestStatus,
    ) -> StoreFuture<'a, bool> {
        let mut requests = self.requests.write();
        let matched = match requests.get_mut(&request.id) {
            Some(stored) if stored.status == expected => {
                *stored = request.clone();
                true
            }
            _ => false,
        };
        Box::pin(std::future::ready(Ok(matched)))
    }
}
