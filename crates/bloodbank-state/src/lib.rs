//! # bloodbank-state: Blood Request Lifecycle
//!
//! Implements the blood request state machine as an enum with validated
//! transitions. Every transition method checks the current state and
//! returns a structured [`RequestError`] instead of silently moving.
//!
//! ## State Machine
//!
//! ```text
//! PENDING ─approve()──▶ APPROVED ─fulfill()──▶ FULFILLED
//!    │
//!    └────reject()────▶ REJECTED
//! ```
//!
//! `REJECTED` and `FULFILLED` are terminal. No transition skips a state.
//!
//! Inventory is deliberately absent here: this crate knows which key a
//! request debits ([`BloodRequest::inventory_key`]) but never touches stock.
//! Debiting on approval is the lifecycle controller's job in
//! `bloodbank-engine`.

pub mod request;

pub use request::{
    BloodRequest, RequestDraft, RequestError, RequestStatus, RequestTransitionRecord,
    MAX_PURPOSE_CHARS,
};
