//! # Configuration Generators
//!
//! A [`ConfigurationGenerator`] owns one configuration version: it turns a
//! registry snapshot into that version's private and shared parameters and
//! validates documents against that version's rules.
//!
//! Generators are looked up through a [`GeneratorSet`]. Asking the set for a
//! version nobody registered fails with
//! [`GeneratorError::UnsupportedVersionOperation`]; there is no fallback
//! implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use fedconf_core::{
    ConfigurationVersion, DocumentKind, ParameterValidationError, PrivateParametersDocument,
    SharedParametersDocument,
};
use fedconf_schema::ParameterValidator;

use crate::registry::RegistrySnapshot;
use crate::v1::V1Generator;
use crate::v2::V2Generator;

/// The registry state cannot be expressed in a version's documents.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Some registry element has no representation in this version.
    #[error("cannot generate {kind} parameters {version}: {path}: {reason}")]
    Unrepresentable {
        /// Document kind.
        kind: DocumentKind,
        /// Version being generated.
        version: ConfigurationVersion,
        /// Location of the offending registry element.
        path: String,
        /// Why it cannot be expressed.
        reason: String,
    },

    /// The generated body could not be serialized.
    #[error("failed to serialize generated parameters: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Operations a generator performs, named in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorOperation {
    /// `generate_private_parameters`
    GeneratePrivateParameters,
    /// `validate_private_parameters`
    ValidatePrivateParameters,
    /// `generate_shared_parameters`
    GenerateSharedParameters,
    /// `validate_shared_parameters`
    ValidateSharedParameters,
}

impl std::fmt::Display for GeneratorOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::GeneratePrivateParameters => "generate_private_parameters",
            Self::ValidatePrivateParameters => "validate_private_parameters",
            Self::GenerateSharedParameters => "generate_shared_parameters",
            Self::ValidateSharedParameters => "validate_shared_parameters",
        })
    }
}

/// Errors surfaced by a [`GeneratorSet`].
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// No generator is registered for the version.
    #[error("{operation} is not supported for configuration version {version}")]
    UnsupportedVersionOperation {
        /// Requested version.
        version: ConfigurationVersion,
        /// Requested operation.
        operation: GeneratorOperation,
    },

    /// A generator for the version is already registered.
    #[error("a generator for configuration version {0} is already registered")]
    DuplicateGenerator(ConfigurationVersion),

    /// Generation failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Validation failed.
    #[error(transparent)]
    Validation(#[from] ParameterValidationError),
}

/// One configuration version's generation and validation rules.
pub trait ConfigurationGenerator: Send + Sync {
    /// The version this generator produces.
    fn version(&self) -> ConfigurationVersion;

    /// Whether this version may become the current version.
    fn eligible_for_current(&self) -> bool {
        true
    }

    /// Build private parameters from `snapshot`.
    fn generate_private_parameters(
        &self,
        snapshot: &RegistrySnapshot,
    ) -> Result<PrivateParametersDocument, GenerationError>;

    /// Check private parameters against this version's rules.
    fn validate_private_parameters(
        &self,
        doc: &PrivateParametersDocument,
    ) -> Result<(), ParameterValidationError>;

    /// Build shared parameters from `snapshot`.
    fn generate_shared_parameters(
        &self,
        snapshot: &RegistrySnapshot,
    ) -> Result<SharedParametersDocument, GenerationError>;

    /// Check shared parameters against this version's rules.
    fn validate_shared_parameters(
        &self,
        doc: &SharedParametersDocument,
    ) -> Result<(), ParameterValidationError>;
}

/// Generators keyed by version.
#[derive(Clone, Default)]
pub struct GeneratorSet {
    generators: BTreeMap<ConfigurationVersion, Arc<dyn ConfigurationGenerator>>,
}

impl std::fmt::Debug for GeneratorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorSet")
            .field("versions", &self.versions())
            .finish()
    }
}

impl GeneratorSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in v1 and v2 generators sharing one validator.
    pub fn with_builtin(validator: Arc<ParameterValidator>) -> Self {
        let mut generators: BTreeMap<ConfigurationVersion, Arc<dyn ConfigurationGenerator>> =
            BTreeMap::new();
        generators.insert(
            ConfigurationVersion::V1,
            Arc::new(V1Generator::new(Arc::clone(&validator))),
        );
        generators.insert(ConfigurationVersion::V2, Arc::new(V2Generator::new(validator)));
        Self { generators }
    }

    /// Register a generator.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::DuplicateGenerator`] if its version is taken.
    pub fn register(
        &mut self,
        generator: Arc<dyn ConfigurationGenerator>,
    ) -> Result<(), GeneratorError> {
        let version = generator.version();
        if self.generators.contains_key(&version) {
            return Err(GeneratorError::DuplicateGenerator(version));
        }
        self.generators.insert(version, generator);
        Ok(())
    }

    /// Registered versions, ascending.
    pub fn versions(&self) -> Vec<ConfigurationVersion> {
        self.generators.keys().copied().collect()
    }

    /// Registered generators, ascending by version.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<dyn ConfigurationGenerator>> {
        self.generators.values()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// The generator for `version`, for performing `operation`.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::UnsupportedVersionOperation`] if none is registered.
    pub fn get(
        &self,
        version: ConfigurationVersion,
        operation: GeneratorOperation,
    ) -> Result<&Arc<dyn ConfigurationGenerator>, GeneratorError> {
        self.generators
            .get(&version)
            .ok_or(GeneratorError::UnsupportedVersionOperation { version, operation })
    }

    /// Generate private parameters of `version`.
    pub fn generate_private_parameters(
        &self,
        version: ConfigurationVersion,
        snapshot: &RegistrySnapshot,
    ) -> Result<PrivateParametersDocument, GeneratorError> {
        let generator = self.get(version, GeneratorOperation::GeneratePrivateParameters)?;
        Ok(generator.generate_private_parameters(snapshot)?)
    }

    /// Validate private parameters against `version`.
    pub fn validate_private_parameters(
        &self,
        version: ConfigurationVersion,
        doc: &PrivateParametersDocument,
    ) -> Result<(), GeneratorError> {
        let generator = self.get(version, GeneratorOperation::ValidatePrivateParameters)?;
        Ok(generator.validate_private_parameters(doc)?)
    }

    /// Generate shared parameters of `version`.
    pub fn generate_shared_parameters(
        &self,
        version: ConfigurationVersion,
        snapshot: &RegistrySnapshot,
    ) -> Result<SharedParametersDocument, GeneratorError> {
        let generator = self.get(version, GeneratorOperation::GenerateSharedParameters)?;
        Ok(generator.generate_shared_parameters(snapshot)?)
    }

    /// Validate shared parameters against `version`.
    pub fn validate_shared_parameters(
        &self,
        version: ConfigurationVersion,
        doc: &SharedParametersDocument,
    ) -> Result<(), GeneratorError> {
        let generator = self.get(version, GeneratorOperation::ValidateSharedParameters)?;
        Ok(generator.validate_shared_parameters(doc)?)
    }
}

/// A generator wrapper overriding eligibility for current.
///
/// Used to apply per-version eligibility from configuration without touching
/// the wrapped generator.
pub struct Eligibility {
    inner: Arc<dyn ConfigurationGenerator>,
    eligible: bool,
}

impl Eligibility {
    /// Wrap `inner`, forcing its eligibility to `eligible`.
    pub fn new(inner: Arc<dyn ConfigurationGenerator>, eligible: bool) -> Self {
        Self { inner, eligible }
    }
}

impl ConfigurationGenerator for Eligibility {
    fn version(&self) -> ConfigurationVersion {
        self.inner.version()
    }

    fn eligible_for_current(&self) -> bool {
        self.eligible
    }

    fn generate_private_parameters(
        &self,
        snapshot: &RegistrySnapshot,
    ) -> Result<PrivateParametersDocument, GenerationError> {
        self.inner.generate_private_parameters(snapshot)
    }

    fn validate_private_parameters(
        &self,
        doc: &PrivateParametersDocument,
    ) -> Result<(), ParameterValidationError> {
        self.inner.validate_private_parameters(doc)
    }

    fn generate_shared_parameters(
        &self,
        snapshot: &RegistrySnapshot,
    ) -> Result<SharedParametersDocument, GenerationError> {
        self.inner.generate_shared_parameters(snapshot)
    }

    fn validate_shared_parameters(
        &self,
        doc: &SharedParametersDocument,
    ) -> Result<(), ParameterValidationError> {
        self.inner.validate_shared_parameters(doc)
    }
}

impl GeneratorSet {
    /// Replace the generator for `version` with one whose eligibility is
    /// forced to `eligible`.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::UnsupportedVersionOperation`] if none is registered.
    pub fn set_eligibility(
        &mut self,
        version: ConfigurationVersion,
        eligible: bool,
    ) -> Result<(), GeneratorError> {
        let inner = Arc::clone(self.get(version, GeneratorOperation::GeneratePrivateParameters)?);
        self.generators
            .insert(version, Arc::new(Eligibility::new(inner, eligible)));
        Ok(())
    }
}
