//! # Current-Version Policy
//!
//! Decides which registered configuration version is "current". During a
//! migration window a new version can be held back: it is still generated
//! and published, but not selected as current.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fedconf_core::ConfigurationVersion;

use crate::generator::GeneratorSet;

/// Policy failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PolicyError {
    /// No registered version is eligible to be current.
    #[error("no configuration version is eligible to be current (registered: {})", list(registered))]
    NoCurrentVersion {
        /// Versions registered at the time of the decision.
        registered: Vec<ConfigurationVersion>,
    },
}

fn list(versions: &[ConfigurationVersion]) -> String {
    if versions.is_empty() {
        return "none".to_string();
    }
    versions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Selects the current version among registered generators.
///
/// The current version is the highest registered version whose generator is
/// eligible and which is not held back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPolicy {
    held_back: BTreeSet<ConfigurationVersion>,
}

impl VersionPolicy {
    /// A policy holding nothing back.
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy holding back `versions`.
    pub fn with_held_back(versions: impl IntoIterator<Item = ConfigurationVersion>) -> Self {
        Self {
            held_back: versions.into_iter().collect(),
        }
    }

    /// Hold `version` back from becoming current.
    pub fn hold_back(&mut self, version: ConfigurationVersion) {
        self.held_back.insert(version);
    }

    /// End the migration window for `version`.
    pub fn release(&mut self, version: ConfigurationVersion) {
        self.held_back.remove(&version);
    }

    /// Whether `version` is held back.
    pub fn is_held_back(&self, version: ConfigurationVersion) -> bool {
        self.held_back.contains(&version)
    }

    /// Held-back versions, ascending.
    pub fn held_back(&self) -> impl Iterator<Item = ConfigurationVersion> + '_ {
        self.held_back.iter().copied()
    }

    /// Select the current version.
    ///
    /// # Errors
    ///
    /// [`PolicyError::NoCurrentVersion`] if no registered version qualifies.
    pub fn current_version(
        &self,
        generators: &GeneratorSet,
    ) -> Result<ConfigurationVersion, PolicyError> {
        generators
            .iter()
            .rev()
            .find(|g| g.eligible_for_current() && !self.is_held_back(g.version()))
            .map(|g| g.version())
            .ok_or_else(|| PolicyError::NoCurrentVersion {
                registered: generators.versions(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedconf_schema::ParameterValidator;
    use std::sync::Arc;

    fn builtin() -> GeneratorSet {
        GeneratorSet::with_builtin(Arc::new(ParameterValidator::new().unwrap()))
    }

    #[test]
    fn highest_eligible_wins() {
        let policy = VersionPolicy::new();
        assert_eq!(policy.current_version(&builtin()), Ok(ConfigurationVersion::V2));
    }

    #[test]
    fn held_back_version_is_skipped() {
        let mut policy = VersionPolicy::with_held_back([ConfigurationVersion::V2]);
        assert_eq!(policy.current_version(&builtin()), Ok(ConfigurationVersion::V1));
        policy.release(ConfigurationVersion::V2);
        assert_eq!(policy.current_version(&builtin()), Ok(ConfigurationVersion::V2));
    }

    #[test]
    fn ineligible_generator_is_skipped() {
        let mut set = builtin();
        set.set_eligibility(ConfigurationVersion::V2, false).unwrap();
        assert_eq!(
            VersionPolicy::new().current_version(&set),
            Ok(ConfigurationVersion::V1)
        );
    }

    #[test]
    fn nothing_eligible_is_a_fault() {
        let policy =
            VersionPolicy::with_held_back([ConfigurationVersion::V1, ConfigurationVersion::V2]);
        let err = policy.current_version(&builtin()).unwrap_err();
        assert_eq!(
            err,
            PolicyError::NoCurrentVersion {
                registered: vec![ConfigurationVersion::V1, ConfigurationVersion::V2]
            }
        );
        assert!(err.to_string().contains("registered: v1, v2"));

        let empty = VersionPolicy::new().current_version(&GeneratorSet::new());
        assert!(empty.unwrap_err().to_string().contains("registered: none"));
    }
}
