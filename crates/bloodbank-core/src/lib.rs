//! # bloodbank-core: Foundational Types for the Blood Bank Stack
//!
//! This crate defines the primitives every other crate in the workspace
//! depends on. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Closed blood group enumeration.** [`BloodGroup`] has exactly eight
//!    variants. Parsing is the only way in from text, so an unrecognized
//!    group is rejected at the boundary and never reaches the ledger.
//!
//! 2. **Newtype wrappers for identifiers.** [`RequestId`], [`BankId`] and
//!    [`RecipientId`] are distinct types. You cannot pass a bank where a
//!    recipient is expected.
//!
//! 3. **[`Units`] is always positive.** Requested quantities, credits and
//!    debits are validated at construction, so the engine never sees a zero
//!    or negative amount.
//!
//! 4. **[`BloodBankError`] taxonomy.** Structured errors with `thiserror`,
//!    one variant per caller-visible failure kind.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `bloodbank-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod blood_group;
pub mod error;
pub mod identity;
pub mod units;

// Re-export primary types for ergonomic imports.
pub use blood_group::BloodGroup;
pub use error::{BloodBankError, ValidationError};
pub use identity::{BankId, InventoryKey, RecipientId, RequestId};
pub use units::Units;
