//! # Identity Newtypes
//!
//! UUID-based identifiers for requests, banks and recipients. Each is a
//! distinct type and always valid by construction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blood_group::BloodGroup;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_newtype!(
    /// A unique identifier for a blood request.
    RequestId
);

uuid_newtype!(
    /// A unique identifier for a blood bank (a stock-holding site).
    BankId
);

uuid_newtype!(
    /// A unique identifier for a recipient (patient or ordering facility).
    RecipientId
);

/// Composite key of an inventory entry: one bank, one blood group.
///
/// Ordering is by bank then group, which is the order ledger queries
/// return entries in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InventoryKey {
    /// The bank holding the stock.
    pub bank_id: BankId,
    /// The blood group of the stock.
    pub blood_group: BloodGroup,
}

impl InventoryKey {
    /// Build a key from its parts.
    pub fn new(bank_id: BankId, blood_group: BloodGroup) -> Self {
        Self {
            bank_id,
            blood_group,
        }
    }
}

impl fmt::Display for InventoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bank_id, self.blood_group)
    }
}
