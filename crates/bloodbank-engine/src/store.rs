//! # Storage Seam
//!
//! The ledger and the lifecycle controller never talk to a database
//! directly. They hold an `Arc<dyn InventoryStore>` / `Arc<dyn RequestStore>`
//! injected at construction.
//!
//! Methods return boxed futures so both traits stay object-safe and the
//! backend can be picked at runtime (in-memory vs. Postgres).
//!
//! ## Backend contract
//!
//! - [`InventoryStore::apply_delta`] is atomic and conditional: it must not
//!   write when the resulting balance would be negative or overflow, and
//!   reports that by returning `Ok(None)`.
//! - [`RequestStore::update_request`] is a compare-and-set on status: it
//!   writes only when the stored status equals `expected` and returns
//!   whether it did.
//! - Every failure is a [`StoreError`]. Timeouts are reported, never
//!   retried.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use bloodbank_core::{BloodBankError, InventoryKey, RequestId};
use bloodbank_state::{BloodRequest, RequestStatus};

use crate::ledger::InventoryEntry;

/// Boxed, sendable future returned by storage operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Storage backend failures.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or rejected the operation.
    #[error("storage backend unavailable during {op}: {reason}")]
    Unavailable {
        /// The storage operation that failed.
        op: &'static str,
        /// Driver-level description.
        reason: String,
    },

    /// The operation did not complete within the configured limit.
    #[error("storage operation {op} timed out after {after:?}")]
    Timeout {
        /// The storage operation that timed out.
        op: &'static str,
        /// The limit that elapsed.
        after: Duration,
    },

    /// A stored row could not be decoded.
    #[error("corrupt stored record during {op}: {reason}")]
    Corrupt {
        /// The storage operation that read the row.
        op: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

impl From<StoreError> for BloodBankError {
    fn from(err: StoreError) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

/// Persistent per-(bank, blood group) unit counts.
pub trait InventoryStore: Send + Sync {
    /// Fetch one entry, or `None` if the key has never been credited.
    fn get_entry(&self, key: InventoryKey) -> StoreFuture<'_, Option<InventoryEntry>>;

    /// Atomically add `delta` (which may be negative) to the entry.
    ///
    /// Creates the entry at zero first when absent. Returns the updated
    /// entry, or `None` without writing if the result would leave the
    /// `0..=u32::MAX` range.
    fn apply_delta(&self, key: InventoryKey, delta: i64)
        -> StoreFuture<'_, Option<InventoryEntry>>;

    /// Every entry, in any order.
    fn list_entries(&self) -> StoreFuture<'_, Vec<InventoryEntry>>;
}

/// Persistent blood request records.
pub trait RequestStore: Send + Sync {
    /// Insert a newly submitted request.
    fn insert_request<'a>(&'a self, request: &'a BloodRequest) -> StoreFuture<'a, ()>;

    /// Fetch one request by id.
    fn get_request(&self, id: RequestId) -> StoreFuture<'_, Option<BloodRequest>>;

    /// Every request, in any order.
    fn list_requests(&self) -> StoreFuture<'_, Vec<BloodRequest>>;

    /// Overwrite a request if its stored status still equals `expected`.
    fn update_request<'a>(
        &'a self,
        request: &'a BloodRequest,
        expected: RequestStatus,
    ) -> StoreFuture<'a, bool>;
}

/// Run a storage future with a time limit.
///
/// An elapsed limit becomes [`StoreError::Timeout`]; the inner future is
/// dropped, which cancels it.
pub async fn bounded<T, F>(limit: Duration, op: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(op, ?limit, "storage operation timed out");
            Err(StoreError::Timeout { op, after: limit })
        }
    }
}
