//! # Blood Groups
//!
//! The eight ABO/Rh donor/recipient compatibility categories. The set is
//! closed: there is no "unknown" or free-text group anywhere in the stack.
//!
//! The wire form is the conventional notation (`"A+"`, `"AB-"`, `"O-"`).
//! Parsing trims surrounding whitespace and accepts lowercase letters, but
//! nothing else: `"A"`, `"A +"` and `"0+"` are all rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// An ABO/Rh blood group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BloodGroup {
    /// A, Rh positive.
    APos,
    /// A, Rh negative.
    ANeg,
    /// B, Rh positive.
    BPos,
    /// B, Rh negative.
    BNeg,
    /// AB, Rh positive.
    AbPos,
    /// AB, Rh negative.
    AbNeg,
    /// O, Rh positive.
    OPos,
    /// O, Rh negative.
    ONeg,
}

impl BloodGroup {
    /// Every recognized blood group, in canonical order.
    pub const ALL: [BloodGroup; 8] = [
        Self::APos,
        Self::ANeg,
        Self::BPos,
        Self::BNeg,
        Self::AbPos,
        Self::AbNeg,
        Self::OPos,
        Self::ONeg,
    ];

    /// The conventional notation for this group.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APos => "A+",
            Self::ANeg => "A-",
            Self::BPos => "B+",
            Self::BNeg => "B-",
            Self::AbPos => "AB+",
            Self::AbNeg => "AB-",
            Self::OPos => "O+",
            Self::ONeg => "O-",
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|group| group.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownBloodGroup(s.to_string()))
    }
}

impl Serialize for BloodGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BloodGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
