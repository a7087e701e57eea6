//! # Configuration Versions
//!
//! A [`ConfigurationVersion`] identifies one revision of the generation
//! protocol. Versions are immutable once defined and ordered numerically.
//! Which version is *current* is decided by policy, never by the value
//! itself.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A numbered schema/protocol revision for generated parameter documents.
///
/// Serialized as a bare integer. Version `0` does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ConfigurationVersion(u32);

impl ConfigurationVersion {
    /// The first protocol revision.
    pub const V1: Self = Self(1);
    /// The second protocol revision.
    pub const V2: Self = Self(2);

    /// Construct a version from its number.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidVersion`] for `0`.
    pub fn new(number: u32) -> Result<Self, ValidationError> {
        if number == 0 {
            return Err(ValidationError::InvalidVersion(number.to_string()));
        }
        Ok(Self(number))
    }

    /// The numeric value of this version.
    pub fn number(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for ConfigurationVersion {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConfigurationVersion> for u32 {
    fn from(value: ConfigurationVersion) -> Self {
        value.0
    }
}

impl std::str::FromStr for ConfigurationVersion {
    type Err = ValidationError;

    /// Accepts `2` as well as `v2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches(['v', 'V']);
        let number = digits
            .parse::<u32>()
            .map_err(|_| ValidationError::InvalidVersion(s.to_string()))?;
        Self::new(number)
    }
}

impl std::fmt::Display for ConfigurationVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}
