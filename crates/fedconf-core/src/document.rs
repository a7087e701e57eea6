//! # Parameter Documents
//!
//! A [`ParametersDocument`] is one generated configuration artifact: the
//! version that produced it, the generation timestamp, and the
//! version-specific body. The two document families share one
//! representation and are told apart at the type level by a marker kind:
//!
//! - [`PrivateParametersDocument`]: the federation operator's own trust
//!   material (configuration anchor, management service, operator servers).
//! - [`SharedParametersDocument`]: the federation-wide directory.
//!
//! Documents are immutable after construction. The serialized form is a flat
//! JSON object: `version`, `generatedAt`, then the body's keys.

use std::marker::PhantomData;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::canonical::CanonicalBytes;
use crate::digest::{sha256_digest, ContentDigest};
use crate::error::CanonicalizationError;
use crate::version::ConfigurationVersion;

/// Keys owned by the document envelope; a body never carries them.
const ENVELOPE_KEYS: [&str; 2] = ["version", "generatedAt"];

/// Which document family a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Private parameters.
    Private,
    /// Shared parameters.
    Shared,
}

impl DocumentKind {
    /// File name used when the document is published.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Private => "private-params.json",
            Self::Shared => "shared-params.json",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => f.write_str("private"),
            Self::Shared => f.write_str("shared"),
        }
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "shared" => Ok(Self::Shared),
            other => Err(format!("unknown document kind \"{other}\" (expected private or shared)")),
        }
    }
}

/// Type-level marker for a document family.
pub trait ParametersKind: std::fmt::Debug + Clone + Send + Sync + 'static {
    /// The runtime kind this marker stands for.
    const KIND: DocumentKind;
}

/// Marker for private parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Private;

/// Marker for shared parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shared;

impl ParametersKind for Private {
    const KIND: DocumentKind = DocumentKind::Private;
}

impl ParametersKind for Shared {
    const KIND: DocumentKind = DocumentKind::Shared;
}

/// A versioned parameters document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound = "")]
pub struct ParametersDocument<K: ParametersKind> {
    version: ConfigurationVersion,
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    content: Map<String, Value>,
    #[serde(skip)]
    kind: PhantomData<K>,
}

/// Private parameters of one configuration version.
pub type PrivateParametersDocument = ParametersDocument<Private>;

/// Shared parameters of one configuration version.
pub type SharedParametersDocument = ParametersDocument<Shared>;

impl<K: ParametersKind> ParametersDocument<K> {
    /// Assemble a document.
    ///
    /// `generated_at` is truncated to whole seconds. Envelope keys present in
    /// `content` are dropped: the envelope is authoritative.
    pub fn new(
        version: ConfigurationVersion,
        generated_at: DateTime<Utc>,
        mut content: Map<String, Value>,
    ) -> Self {
        for key in ENVELOPE_KEYS {
            content.remove(key);
        }
        Self {
            version,
            generated_at: generated_at.trunc_subsecs(0),
            content,
            kind: PhantomData,
        }
    }

    /// Parse a document from its serialized JSON form.
    ///
    /// # Errors
    ///
    /// Fails if the envelope fields are missing or malformed.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// The document family.
    pub fn kind(&self) -> DocumentKind {
        K::KIND
    }

    /// The version this document declares.
    pub fn version(&self) -> ConfigurationVersion {
        self.version
    }

    /// When the document was generated.
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// The version-specific body.
    pub fn content(&self) -> &Map<String, Value> {
        &self.content
    }

    /// The full serialized form, envelope included.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialization failures.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Digest of the version and body, excluding `generatedAt`.
    ///
    /// Two generations from the same registry state have equal digests.
    ///
    /// # Errors
    ///
    /// Fails if the body contains a float.
    pub fn content_digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        let subject = serde_json::json!({
            "kind": K::KIND,
            "version": self.version,
            "content": self.content,
        });
        Ok(sha256_digest(&CanonicalBytes::new(&subject)?))
    }

    /// Whether `other` is equivalent field-for-field, ignoring timestamps.
    pub fn same_content(&self, other: &Self) -> bool {
        self.version == other.version && self.content == other.content
    }
}
