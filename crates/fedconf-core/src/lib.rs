#![deny(missing_docs)]

//! # fedconf-core — Foundational Types for Federation Trust Configuration
//!
//! Every other crate in the workspace depends on this one. It has no internal
//! crate dependencies, only `serde`, `serde_json`, `base64`, `thiserror`,
//! `chrono`, and `sha2` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** A [`ConfigurationVersion`]
//!    is not a bare integer and a [`MemberId`] is not a bare string pair.
//!
//! 2. **Documents carry their version.** A [`ParametersDocument`] cannot be
//!    built without the [`ConfigurationVersion`] of the generator that
//!    produced it, and the version is part of its serialized form.
//!
//! 3. **[`CanonicalBytes`] is the sole path to digest computation.** Content
//!    digests of published documents flow through `CanonicalBytes::new()`, so
//!    two semantically equal documents always digest identically.
//!
//! 4. **Structured errors.** [`CertificateError`] and
//!    [`ParameterValidationError`] carry the offending file, version, and
//!    JSON Pointer path so operators can act without reading logs.

pub mod canonical;
pub mod certificate;
pub mod digest;
pub mod document;
pub mod error;
pub mod identity;
pub mod version;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use certificate::{CertificateBytes, CERT_MAX_BYTES};
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use document::{
    DocumentKind, ParametersDocument, ParametersKind, Private, PrivateParametersDocument, Shared,
    SharedParametersDocument,
};
pub use error::{
    CanonicalizationError, CertificateError, DeclaredVersion, FedconfError, InvalidCertificateDetail,
    ParameterValidationError, ValidationError, Violation,
};
pub use identity::{ClientId, MemberId, SecurityServerId};
pub use version::ConfigurationVersion;
