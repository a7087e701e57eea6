//! # Parameter Validator
//!
//! Holds one compiled JSON Schema (Draft 2020-12) per document kind and
//! configuration version. Schemas are embedded at build time so a binary
//! never validates against a schema other than the one it shipped with.
//!
//! Validation order is fixed: unknown version, declared-version mismatch,
//! schema, then semantic rules. Each stage reports every violation it finds
//! before the next stage is skipped.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use thiserror::Error;

use fedconf_core::{
    ConfigurationVersion, DeclaredVersion, DocumentKind, ParameterValidationError,
    PrivateParametersDocument, SharedParametersDocument, Violation,
};

use crate::semantic;

/// Embedded schema sources, keyed by kind and version number.
const EMBEDDED_SCHEMAS: &[(DocumentKind, u32, &str)] = &[
    (
        DocumentKind::Private,
        1,
        include_str!("../schemas/private-params-v1.schema.json"),
    ),
    (
        DocumentKind::Private,
        2,
        include_str!("../schemas/private-params-v2.schema.json"),
    ),
    (
        DocumentKind::Shared,
        1,
        include_str!("../schemas/shared-params-v1.schema.json"),
    ),
    (
        DocumentKind::Shared,
        2,
        include_str!("../schemas/shared-params-v2.schema.json"),
    ),
];

/// An embedded schema failed to parse or compile.
#[derive(Error, Debug)]
pub enum SchemaLoadError {
    /// The schema source is not valid JSON.
    #[error("schema for {kind} parameters v{version} is not valid JSON: {reason}")]
    Parse {
        /// Document kind.
        kind: DocumentKind,
        /// Version number.
        version: u32,
        /// Parser message.
        reason: String,
    },

    /// The schema could not be compiled.
    #[error("failed to compile schema for {kind} parameters v{version}: {reason}")]
    Compile {
        /// Document kind.
        kind: DocumentKind,
        /// Version number.
        version: u32,
        /// Compiler message.
        reason: String,
    },

    /// An embedded entry carries version 0.
    #[error("embedded schema for {kind} parameters has invalid version {version}")]
    InvalidVersion {
        /// Document kind.
        kind: DocumentKind,
        /// The offending number.
        version: u32,
    },
}

struct CompiledSchema {
    id: String,
    raw: Value,
    validator: jsonschema::Validator,
}

/// Validates parameters documents against their version's rules.
///
/// Construct once and share; the validator is immutable and `Send + Sync`.
pub struct ParameterValidator {
    schemas: HashMap<(DocumentKind, ConfigurationVersion), CompiledSchema>,
}

impl std::fmt::Debug for ParameterValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.schemas.values().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        f.debug_struct("ParameterValidator")
            .field("schemas", &ids)
            .finish()
    }
}

impl ParameterValidator {
    /// Compile every embedded schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaLoadError`] if an embedded schema is broken, which
    /// indicates a packaging defect rather than bad input.
    pub fn new() -> Result<Self, SchemaLoadError> {
        let mut schemas = HashMap::new();
        for &(kind, number, source) in EMBEDDED_SCHEMAS {
            let version = ConfigurationVersion::new(number)
                .map_err(|_| SchemaLoadError::InvalidVersion { kind, version: number })?;
            let raw: Value =
                serde_json::from_str(source).map_err(|e| SchemaLoadError::Parse {
                    kind,
                    version: number,
                    reason: e.to_string(),
                })?;
            let validator = jsonschema::options()
                .with_draft(jsonschema::Draft::Draft202012)
                .build(&raw)
                .map_err(|e| SchemaLoadError::Compile {
                    kind,
                    version: number,
                    reason: e.to_string(),
                })?;
            let id = raw
                .get("$id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            tracing::debug!(%kind, %version, schema = %id, "compiled parameters schema");
            schemas.insert((kind, version), CompiledSchema { id, raw, validator });
        }
        Ok(Self { schemas })
    }

    /// Versions that have a schema for `kind`, ascending.
    pub fn supported_versions(&self, kind: DocumentKind) -> BTreeSet<ConfigurationVersion> {
        self.schemas
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, v)| *v)
            .collect()
    }

    /// The raw schema for `kind` at `version`.
    pub fn schema(&self, kind: DocumentKind, version: ConfigurationVersion) -> Option<&Value> {
        self.schemas.get(&(kind, version)).map(|s| &s.raw)
    }

    /// Validate an arbitrary JSON value as a `kind` document of `version`.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage with every violation found in it.
    pub fn validate_value(
        &self,
        kind: DocumentKind,
        version: ConfigurationVersion,
        value: &Value,
    ) -> Result<(), ParameterValidationError> {
        let Some(compiled) = self.schemas.get(&(kind, version)) else {
            return Err(ParameterValidationError::UnknownVersion { kind, version });
        };

        let declared = declared_version(value);
        if declared != DeclaredVersion::Version(version) {
            return Err(ParameterValidationError::VersionMismatch {
                kind,
                declared,
                expected: version,
            });
        }

        let violations: Vec<Violation> = compiled
            .validator
            .iter_errors(value)
            .map(|err| Violation::new(err.instance_path.to_string(), err.to_string()))
            .collect();
        if !violations.is_empty() {
            tracing::debug!(%kind, %version, count = violations.len(), "schema violations");
            return Err(ParameterValidationError::Schema {
                kind,
                version,
                violations,
            });
        }

        let violations = match kind {
            DocumentKind::Private => semantic::check_private(version, value),
            DocumentKind::Shared => semantic::check_shared(version, value),
        };
        if !violations.is_empty() {
            tracing::debug!(%kind, %version, count = violations.len(), "semantic violations");
            return Err(ParameterValidationError::Semantic {
                kind,
                version,
                violations,
            });
        }
        Ok(())
    }

    /// Validate a JSON value as private parameters.
    pub fn validate_private_value(
        &self,
        version: ConfigurationVersion,
        value: &Value,
    ) -> Result<(), ParameterValidationError> {
        self.validate_value(DocumentKind::Private, version, value)
    }

    /// Validate a JSON value as shared parameters.
    pub fn validate_shared_value(
        &self,
        version: ConfigurationVersion,
        value: &Value,
    ) -> Result<(), ParameterValidationError> {
        self.validate_value(DocumentKind::Shared, version, value)
    }

    /// Validate a typed private parameters document against `version`.
    pub fn validate_private(
        &self,
        doc: &PrivateParametersDocument,
        version: ConfigurationVersion,
    ) -> Result<(), ParameterValidationError> {
        let value = serialized(DocumentKind::Private, version, doc.to_value())?;
        self.validate_private_value(version, &value)
    }

    /// Validate a typed shared parameters document against `version`.
    pub fn validate_shared(
        &self,
        doc: &SharedParametersDocument,
        version: ConfigurationVersion,
    ) -> Result<(), ParameterValidationError> {
        let value = serialized(DocumentKind::Shared, version, doc.to_value())?;
        self.validate_shared_value(version, &value)
    }
}

fn declared_version(value: &Value) -> DeclaredVersion {
    value
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .and_then(|n| ConfigurationVersion::new(n).ok())
        .map_or(DeclaredVersion::Missing, DeclaredVersion::Version)
}

fn serialized(
    kind: DocumentKind,
    version: ConfigurationVersion,
    result: Result<Value, serde_json::Error>,
) -> Result<Value, ParameterValidationError> {
    result.map_err(|e| ParameterValidationError::Schema {
        kind,
        version,
        violations: vec![Violation::new("", format!("document does not serialize: {e}"))],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compiles_all_embedded_schemas() {
        let v = ParameterValidator::new().expect("embedded schemas compile");
        for kind in [DocumentKind::Private, DocumentKind::Shared] {
            let versions: Vec<u32> = v
                .supported_versions(kind)
                .into_iter()
                .map(ConfigurationVersion::number)
                .collect();
            assert_eq!(versions, vec![1, 2]);
        }
        let id = v
            .schema(DocumentKind::Shared, ConfigurationVersion::V2)
            .and_then(|s| s.get("$id"))
            .and_then(Value::as_str);
        assert_eq!(id, Some("https://schemas.fedconf.dev/shared-params/v2.schema.json"));
    }

    #[test]
    fn unknown_version_is_reported_first() {
        let v = ParameterValidator::new().unwrap();
        let v9 = ConfigurationVersion::new(9).unwrap();
        let err = v.validate_shared_value(v9, &json!({})).unwrap_err();
        assert!(matches!(err, ParameterValidationError::UnknownVersion { .. }));
    }

    #[test]
    fn declared_version_must_match() {
        let v = ParameterValidator::new().unwrap();
        let err = v
            .validate_shared_value(ConfigurationVersion::V2, &json!({"version": 1}))
            .unwrap_err();
        assert_eq!(
            err,
            ParameterValidationError::VersionMismatch {
                kind: DocumentKind::Shared,
                declared: DeclaredVersion::Version(ConfigurationVersion::V1),
                expected: ConfigurationVersion::V2,
            }
        );

        let err = v
            .validate_private_value(ConfigurationVersion::V1, &json!({"version": "1"}))
            .unwrap_err();
        assert!(matches!(
            err,
            ParameterValidationError::VersionMismatch {
                declared: DeclaredVersion::Missing,
                ..
            }
        ));
    }

    #[test]
    fn schema_violations_carry_pointers() {
        let v = ParameterValidator::new().unwrap();
        let doc = json!({
            "version": 1,
            "generatedAt": "2026-01-01T00:00:00Z",
            "instanceIdentifier": "EE",
            "approvedCAs": [],
            "approvedTSAs": [],
            "members": [{"memberClass": "GOV", "memberCode": "1", "name": "", "subsystems": []}],
            "securityServers": [],
            "globalGroups": [],
            "globalSettings": {"ocspFreshnessSeconds": 600}
        });
        let err = v.validate_shared_value(ConfigurationVersion::V1, &doc).unwrap_err();
        let ParameterValidationError::Schema { violations, .. } = err else {
            panic!("expected schema violations, got {err:?}");
        };
        assert!(violations.iter().any(|v| v.path == "/members/0/name"));
    }

    #[test]
    fn empty_shared_v1_document_is_valid() {
        let v = ParameterValidator::new().unwrap();
        let doc = json!({
            "version": 1,
            "generatedAt": "2026-01-01T00:00:00Z",
            "instanceIdentifier": "EE",
            "approvedCAs": [],
            "approvedTSAs": [],
            "members": [],
            "securityServers": [],
            "globalGroups": [],
            "globalSettings": {"ocspFreshnessSeconds": 600}
        });
        v.validate_shared_value(ConfigurationVersion::V1, &doc).unwrap();
        // the same body is not a v2 document
        let mut v2 = doc.clone();
        v2["version"] = json!(2);
        assert!(v.validate_shared_value(ConfigurationVersion::V2, &v2).is_err());
    }
}
