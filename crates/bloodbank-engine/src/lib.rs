//! # bloodbank-engine: Inventory Ledger & Request Lifecycle
//!
//! The logic core of the blood bank stack.
//!
//! - [`ledger::InventoryLedger`] keeps non-negative unit counts per
//!   (bank, blood group) and serializes every credit/debit on the same key.
//! - [`lifecycle::LifecycleController`] owns request status transitions and
//!   is the only component that debits stock as a side effect of one.
//! - [`store`] defines the two narrow storage traits both are built on.
//!   Backends are injected as `Arc<dyn …>`; there is no global state.
//! - [`memory::MemoryStore`] is the in-process backend used for development,
//!   dry runs and tests. The Postgres backend lives in `bloodbank-api`.
//!
//! ## Concurrency
//!
//! Per-key contention is modeled once, in [`lock::KeyedMutex`]. The ledger
//! holds one keyed by inventory key; the controller holds one keyed by
//! request id. Storage backends additionally guard their own writes
//! (conditional deltas, status compare-and-set) so that several processes
//! sharing a database stay consistent.

pub mod ledger;
pub mod lifecycle;
pub mod lock;
pub mod memory;
pub mod store;

pub use ledger::{InventoryEntry, InventoryFilter, InventoryLedger, InventoryView};
pub use lifecycle::{LifecycleController, RequestFilter, ReviewDecision};
pub use lock::{KeyGuard, KeyedMutex};
pub use memory::MemoryStore;
pub use store::{bounded, InventoryStore, RequestStore, StoreError, StoreFuture};
