//! # Error Hierarchy
//!
//! Structured error types shared by the whole workspace, built with
//! `thiserror`. No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Two families matter to callers:
//!
//! - [`CertificateError`]: the only failure shapes a certificate upload can
//!   produce. Parser-specific errors never cross the validator's edge.
//! - [`ParameterValidationError`]: a parameters document failed the schema
//!   or semantic rules of its version. Carries every violation with its
//!   JSON Pointer path.

use thiserror::Error;

use crate::document::DocumentKind;
use crate::version::ConfigurationVersion;

/// Top-level error type for fedconf library crates.
#[derive(Error, Debug)]
pub enum FedconfError {
    /// Certificate material was rejected.
    #[error("certificate error: {0}")]
    Certificate(#[from] CertificateError),

    /// A parameters document failed validation.
    #[error("parameter validation error: {0}")]
    Parameters(#[from] ParameterValidationError),

    /// Domain primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Canonicalization failure during digest computation.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a certificate was judged invalid.
///
/// Deliberately coarse: the underlying parser's own error taxonomy is not
/// exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidCertificateDetail {
    /// The bytes are not a single well-formed X.509 certificate.
    Malformed,
    /// The certificate parsed but a specific check rejected it.
    Check(String),
}

impl std::fmt::Display for InvalidCertificateDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed => f.write_str("not a well-formed X.509 certificate"),
            Self::Check(reason) => f.write_str(reason),
        }
    }
}

/// Failure shapes of certificate validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CertificateError {
    /// The input exceeds the byte cap. Nothing was parsed.
    #[error("certificate file \"{filename}\" is {size} bytes, exceeding the {limit}-byte limit")]
    CertificateTooLarge {
        /// Original filename as supplied by the uploader.
        filename: String,
        /// Observed size in bytes.
        size: u64,
        /// The enforced limit in bytes.
        limit: u64,
    },

    /// Parse or structural failure.
    #[error("certificate file \"{filename}\" is invalid: {detail}")]
    InvalidCertificate {
        /// Original filename as supplied by the uploader.
        filename: String,
        /// Normalized reason.
        detail: InvalidCertificateDetail,
    },
}

impl CertificateError {
    /// The filename echoed in this error.
    pub fn filename(&self) -> &str {
        match self {
            Self::CertificateTooLarge { filename, .. } | Self::InvalidCertificate { filename, .. } => {
                filename
            }
        }
    }
}

/// A single rule violation inside a parameters document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the offending element (empty string for the root).
    pub path: String,
    /// Human-readable description of the violation.
    pub reason: String,
}

impl Violation {
    /// Construct a violation at `path`.
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: {}", self.reason)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A parameters document failed the rules of its configuration version.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterValidationError {
    /// The document declares a different version than the one it is
    /// validated against.
    #[error("{kind} parameters declare version {declared}, expected {expected}")]
    VersionMismatch {
        /// Document kind.
        kind: DocumentKind,
        /// Version found in the document (`None` when absent or malformed).
        declared: DeclaredVersion,
        /// Version the validator was asked to apply.
        expected: ConfigurationVersion,
    },

    /// No schema exists for the requested version.
    #[error("no {kind} parameters schema for version {version}")]
    UnknownVersion {
        /// Document kind.
        kind: DocumentKind,
        /// Requested version.
        version: ConfigurationVersion,
    },

    /// JSON Schema violations.
    #[error("{kind} parameters {version}: {} schema violation(s): {}", violations.len(), join_violations(violations))]
    Schema {
        /// Document kind.
        kind: DocumentKind,
        /// Version whose schema was applied.
        version: ConfigurationVersion,
        /// Every violation found.
        violations: Vec<Violation>,
    },

    /// Semantic (cross-reference) violations.
    #[error("{kind} parameters {version}: {} semantic violation(s): {}", violations.len(), join_violations(violations))]
    Semantic {
        /// Document kind.
        kind: DocumentKind,
        /// Version whose rules were applied.
        version: ConfigurationVersion,
        /// Every violation found.
        violations: Vec<Violation>,
    },
}

impl ParameterValidationError {
    /// The violations carried by this error, if any.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Schema { violations, .. } | Self::Semantic { violations, .. } => violations,
            Self::VersionMismatch { .. } | Self::UnknownVersion { .. } => &[],
        }
    }
}

/// The `version` field as found in a document under validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredVersion {
    /// A valid version number.
    Version(ConfigurationVersion),
    /// The field is missing or is not a positive integer.
    Missing,
}

impl std::fmt::Display for DeclaredVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Version(v) => write!(f, "{v}"),
            Self::Missing => f.write_str("<none>"),
        }
    }
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Configuration version is not a positive integer.
    #[error("invalid configuration version: \"{0}\" (expected a positive integer)")]
    InvalidVersion(String),

    /// An identifier part is empty or contains a reserved character.
    #[error("invalid identifier part {field}: \"{value}\" (must be non-empty and must not contain '/')")]
    InvalidIdentifier {
        /// Which part of the identifier was rejected.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Certificate bytes were not valid base64.
    #[error("invalid base64 certificate encoding: {0}")]
    InvalidBase64(String),
}
