//! # Error Taxonomy
//!
//! Structured error types for the whole stack, built with `thiserror`.
//! Every failure a caller can observe is one of five kinds:
//!
//! | Kind | Meaning | HTTP |
//! |------|---------|------|
//! | `Validation` | bad input, user-correctable | 400 |
//! | `NotFound` | unknown reference | 404 |
//! | `InvalidState` | illegal lifecycle transition | 409 |
//! | `InsufficientInventory` | not enough stock for a debit | 422 |
//! | `StorageUnavailable` | infrastructure fault, retryable by the client | 503 |
//!
//! Nothing in the core retries. Retry, if any, is a client concern.

use chrono::NaiveDate;
use thiserror::Error;

use crate::identity::InventoryKey;

/// Top-level error type for blood bank operations.
#[derive(Error, Debug)]
pub enum BloodBankError {
    /// Input failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// What kind of record was looked up (e.g. "blood request").
        kind: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// The requested lifecycle transition is not allowed from the current state.
    #[error("invalid state: cannot move {id} from {from} to {to}")]
    InvalidState {
        /// The record whose transition was rejected.
        id: String,
        /// Current state name.
        from: String,
        /// Attempted target state name.
        to: String,
    },

    /// A debit would drive an inventory entry below zero.
    #[error("insufficient inventory for {key}: requested {requested}, available {available}")]
    InsufficientInventory {
        /// The (bank, blood group) entry that was short.
        key: InventoryKey,
        /// Units the operation needed.
        requested: u32,
        /// Units on hand when the debit was attempted.
        available: u32,
    },

    /// The storage backend failed or timed out.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl BloodBankError {
    /// Machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

/// Input validation failures.
///
/// Each variant carries the offending value so the message can be shown to
/// the user verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Unit counts must be strictly positive.
    #[error("units must be greater than zero, got {0}")]
    NonPositiveUnits(i64),

    /// Unit count does not fit the ledger's counter.
    #[error("units out of range: {0}")]
    UnitsOutOfRange(i64),

    /// Blood group is not one of the eight ABO/Rh groups.
    #[error("unrecognized blood group \"{0}\" (expected one of A+, A-, B+, B-, AB+, AB-, O+, O-)")]
    UnknownBloodGroup(String),

    /// The required-by date has already passed.
    #[error("required_by date {required_by} is in the past (today is {today})")]
    RequiredByInPast {
        /// The submitted date.
        required_by: NaiveDate,
        /// The date the submission was evaluated on.
        today: NaiveDate,
    },

    /// The purpose text is empty.
    #[error("purpose must not be empty")]
    EmptyPurpose,

    /// The purpose text exceeds the stored column width.
    #[error("purpose must not exceed {max} characters, got {len}")]
    PurposeTooLong {
        /// Submitted length in characters.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// Rejections must say why.
    #[error("notes are required when rejecting a request")]
    MissingRejectionNotes,

    /// A credit would overflow the stored balance.
    #[error("credit of {credit} units to {key} would overflow balance {balance}")]
    InventoryOverflow {
        /// The entry being credited.
        key: InventoryKey,
        /// Balance before the credit.
        balance: u32,
        /// Units being credited.
        credit: u32,
    },
}
