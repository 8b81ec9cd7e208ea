//! # API Route Modules
//!
//! - `requests`: submission, review and fulfillment of blood requests.
//! - `inventory`: stock queries and donation intake.

pub mod inventory;
pub mod requests;
