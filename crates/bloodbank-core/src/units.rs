//! # Unit Quantities
//!
//! A [`Units`] value is a strictly positive count of transfusable units.
//! Balances (which may be zero) are plain `u32`; only amounts that move
//! stock or are requested go through this type.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// A positive number of blood units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Units(u32);

impl Units {
    /// Validate a raw count. Zero and negative values are rejected.
    pub fn new(count: i64) -> Result<Self, ValidationError> {
        if count <= 0 {
            return Err(ValidationError::NonPositiveUnits(count));
        }
        u32::try_from(count)
            .map(Self)
            .map_err(|_| ValidationError::UnitsOutOfRange(count))
    }

    /// The raw count.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Units {
    type Error = ValidationError;

    fn try_from(count: i64) -> Result<Self, Self::Error> {
        Self::new(count)
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Units {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}
