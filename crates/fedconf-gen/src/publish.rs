//! # Publication
//!
//! A [`Publisher`] receives only [`ValidatedBundle`]s. The bundle constructor
//! is private to this crate and called only by the orchestrator after both
//! documents passed their version's validation, so an unvalidated document
//! has no path to publication.
//!
//! [`DirectoryPublisher`] lays bundles out as
//!
//! ```text
//! <root>/v1/private-params.json
//! <root>/v1/shared-params.json
//! <root>/v1/manifest.json
//! <root>/current.json
//! ```
//!
//! A version directory is staged next to its final location and swapped in
//! with a rename; the index is replaced by writing a temporary file and
//! renaming it over `current.json`. Readers never observe a partially
//! written version or index.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use fedconf_core::{
    ConfigurationVersion, ContentDigest, DeclaredVersion, DocumentKind, ParameterValidationError,
    PrivateParametersDocument, SharedParametersDocument,
};

/// Name of the current-version index file.
pub const CURRENT_INDEX_FILE: &str = "current.json";

/// Name of the per-version manifest file.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Publication failures.
#[derive(Error, Debug)]
pub enum PublishError {
    /// A filesystem operation failed.
    #[error("{op} {path}: {source}")]
    Io {
        /// Operation that failed.
        op: &'static str,
        /// Path operated on.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A document or index could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A failed swap could not restore the previous publication, which is
    /// left under `retired`.
    #[error("failed to restore previous publication of {version} from {retired}: {source}")]
    RollbackFailed {
        /// Version being published.
        version: ConfigurationVersion,
        /// Where the previous publication now lives.
        retired: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// `mark_current` named a version that has not been published.
    #[error("configuration version {0} has not been published")]
    NotPublished(ConfigurationVersion),
}

fn io<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(std::io::Error) -> PublishError + 'a {
    move |source| PublishError::Io {
        op,
        path: path.to_path_buf(),
        source,
    }
}

/// Both documents of one version, validated, with their content digests.
#[derive(Debug, Clone)]
pub struct ValidatedBundle {
    version: ConfigurationVersion,
    private: PrivateParametersDocument,
    shared: SharedParametersDocument,
    private_digest: ContentDigest,
    shared_digest: ContentDigest,
}

impl ValidatedBundle {
    /// Pair both documents of `version`.
    ///
    /// # Errors
    ///
    /// [`ParameterValidationError::VersionMismatch`] if either document
    /// declares a version other than `version`.
    pub(crate) fn new(
        version: ConfigurationVersion,
        private: PrivateParametersDocument,
        shared: SharedParametersDocument,
        private_digest: ContentDigest,
        shared_digest: ContentDigest,
    ) -> Result<Self, ParameterValidationError> {
        for (kind, declared) in [
            (DocumentKind::Private, private.version()),
            (DocumentKind::Shared, shared.version()),
        ] {
            if declared != version {
                return Err(ParameterValidationError::VersionMismatch {
                    kind,
                    declared: DeclaredVersion::Version(declared),
                    expected: version,
                });
            }
        }
        Ok(Self {
            version,
            private,
            shared,
            private_digest,
            shared_digest,
        })
    }

    /// The bundle's configuration version.
    pub fn version(&self) -> ConfigurationVersion {
        self.version
    }

    /// Private parameters.
    pub fn private_parameters(&self) -> &PrivateParametersDocument {
        &self.private
    }

    /// Shared parameters.
    pub fn shared_parameters(&self) -> &SharedParametersDocument {
        &self.shared
    }

    /// Digest of the private parameters body.
    pub fn private_digest(&self) -> &ContentDigest {
        &self.private_digest
    }

    /// Digest of the shared parameters body.
    pub fn shared_digest(&self) -> &ContentDigest {
        &self.shared_digest
    }

    /// The manifest recorded alongside the documents.
    pub fn manifest(&self, published_at: DateTime<Utc>) -> Manifest {
        Manifest {
            version: self.version,
            generated_at: self.private.generated_at(),
            published_at,
            private_digest: self.private_digest.clone(),
            shared_digest: self.shared_digest.clone(),
        }
    }
}

/// Per-version publication record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Configuration version.
    pub version: ConfigurationVersion,
    /// When the documents were generated.
    pub generated_at: DateTime<Utc>,
    /// When the bundle was published.
    pub published_at: DateTime<Utc>,
    /// Digest of the private parameters body.
    pub private_digest: ContentDigest,
    /// Digest of the shared parameters body.
    pub shared_digest: ContentDigest,
}

/// The current-version index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentIndex {
    /// The version consumers should use.
    pub current_version: ConfigurationVersion,
    /// When the index was last written.
    pub updated_at: DateTime<Utc>,
}

/// Destination for validated bundles.
pub trait Publisher: Send + Sync {
    /// Publish one version's bundle, replacing any earlier publication of
    /// the same version atomically.
    fn publish(&self, bundle: &ValidatedBundle) -> Result<(), PublishError>;

    /// Point the current-version index at `version`.
    fn mark_current(&self, version: ConfigurationVersion) -> Result<(), PublishError>;

    /// The version the index currently points at, if any.
    fn current(&self) -> Result<Option<ConfigurationVersion>, PublishError>;
}

/// Publishes bundles into a directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    root: PathBuf,
}

impl DirectoryPublisher {
    /// Publish under `root`. The directory is created on first use.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The publication root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding `version`'s bundle.
    pub fn version_dir(&self, version: ConfigurationVersion) -> PathBuf {
        self.root.join(version.to_string())
    }

    /// Read back the manifest of a published version.
    pub fn manifest(&self, version: ConfigurationVersion) -> Result<Option<Manifest>, PublishError> {
        read_json(&self.version_dir(version).join(MANIFEST_FILE))
    }

    fn stage(&self, staging: &Path, bundle: &ValidatedBundle) -> Result<(), PublishError> {
        std::fs::create_dir(staging).map_err(io("create", staging))?;
        let private = serde_json::to_vec_pretty(bundle.private_parameters())?;
        let shared = serde_json::to_vec_pretty(bundle.shared_parameters())?;
        let manifest = serde_json::to_vec_pretty(&bundle.manifest(Utc::now()))?;
        for (name, bytes) in [
            (DocumentKind::Private.file_name(), private),
            (DocumentKind::Shared.file_name(), shared),
            (MANIFEST_FILE, manifest),
        ] {
            let path = staging.join(name);
            std::fs::write(&path, bytes).map_err(io("write", &path))?;
        }
        Ok(())
    }

    fn swap_in(
        &self,
        staging: &Path,
        target: &Path,
        version: ConfigurationVersion,
    ) -> Result<(), PublishError> {
        if !target.exists() {
            return std::fs::rename(staging, target).map_err(io("rename", staging));
        }
        let retired = self
            .root
            .join(format!(".{version}.retired-{}", Uuid::new_v4()));
        std::fs::rename(target, &retired).map_err(io("rename", target))?;
        if let Err(e) = std::fs::rename(staging, target) {
            // put the previous publication back
            if let Err(rollback) = std::fs::rename(&retired, target) {
                tracing::error!(
                    %version,
                    retired = %retired.display(),
                    error = %rollback,
                    "failed to restore previous publication"
                );
                return Err(PublishError::RollbackFailed {
                    version,
                    retired,
                    source: rollback,
                });
            }
            return Err(PublishError::Io {
                op: "rename",
                path: staging.to_path_buf(),
                source: e,
            });
        }
        if let Err(e) = std::fs::remove_dir_all(&retired) {
            tracing::warn!(path = %retired.display(), error = %e, "failed to remove retired publication");
        }
        Ok(())
    }
}

impl Publisher for DirectoryPublisher {
    fn publish(&self, bundle: &ValidatedBundle) -> Result<(), PublishError> {
        std::fs::create_dir_all(&self.root).map_err(io("create", &self.root))?;
        let version = bundle.version();
        let target = self.version_dir(version);
        let staging = self
            .root
            .join(format!(".{version}.staging-{}", Uuid::new_v4()));

        let result = self
            .stage(&staging, bundle)
            .and_then(|()| self.swap_in(&staging, &target, version));
        if result.is_err() && staging.exists() {
            let _ = std::fs::remove_dir_all(&staging);
        }
        result?;

        tracing::info!(
            %version,
            path = %target.display(),
            private_digest = %bundle.private_digest(),
            shared_digest = %bundle.shared_digest(),
            "published configuration bundle"
        );
        Ok(())
    }

    fn mark_current(&self, version: ConfigurationVersion) -> Result<(), PublishError> {
        if !self.version_dir(version).join(MANIFEST_FILE).is_file() {
            return Err(PublishError::NotPublished(version));
        }
        let index = CurrentIndex {
            current_version: version,
            updated_at: Utc::now(),
        };
        write_atomic(
            &self.root.join(CURRENT_INDEX_FILE),
            &serde_json::to_vec_pretty(&index)?,
        )?;
        tracing::info!(%version, "marked current configuration version");
        Ok(())
    }

    fn current(&self) -> Result<Option<ConfigurationVersion>, PublishError> {
        let index: Option<CurrentIndex> = read_json(&self.root.join(CURRENT_INDEX_FILE))?;
        Ok(index.map(|i| i.current_version))
    }
}

/// Replace `path` with `bytes` via a temporary sibling and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PublishError> {
    let temp = path.with_extension("json.tmp");
    std::fs::write(&temp, bytes).map_err(io("write", &temp))?;
    std::fs::rename(&temp, path).map_err(io("rename", &temp))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, PublishError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PublishError::Io {
            op: "read",
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn body(id: &str) -> Map<String, Value> {
        match json!({"instanceIdentifier": id}) {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    fn bundle(version: ConfigurationVersion, id: &str) -> ValidatedBundle {
        let private = PrivateParametersDocument::new(version, Utc::now(), body(id));
        let shared = SharedParametersDocument::new(version, Utc::now(), body(id));
        ValidatedBundle::new(
            version,
            private.clone(),
            shared.clone(),
            private.content_digest().unwrap(),
            shared.content_digest().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn failed_swap_restores_previous_publication() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = DirectoryPublisher::new(dir.path());
        publisher.publish(&bundle(ConfigurationVersion::V1, "EE")).unwrap();
        let target = publisher.version_dir(ConfigurationVersion::V1);

        let missing = dir.path().join(".v1.staging-missing");
        let err = publisher
            .swap_in(&missing, &target, ConfigurationVersion::V1)
            .unwrap_err();
        assert!(matches!(err, PublishError::Io { op: "rename", .. }));
        assert!(publisher.manifest(ConfigurationVersion::V1).unwrap().is_some());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains("retired"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn bundle_refuses_documents_of_another_version() {
        let private = PrivateParametersDocument::new(ConfigurationVersion::V1, Utc::now(), body("EE"));
        let shared = SharedParametersDocument::new(ConfigurationVersion::V1, Utc::now(), body("EE"));
        let v3 = ConfigurationVersion::new(3).unwrap();
        let err = ValidatedBundle::new(
            v3,
            private.clone(),
            shared.clone(),
            private.content_digest().unwrap(),
            shared.content_digest().unwrap(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ParameterValidationError::VersionMismatch {
                kind: DocumentKind::Private,
                declared: DeclaredVersion::Version(ConfigurationVersion::V1),
                expected: v3,
            }
        );
    }

    #[test]
    fn publish_writes_layout() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = DirectoryPublisher::new(dir.path().join("out"));
        publisher.publish(&bundle(ConfigurationVersion::V1, "EE")).unwrap();

        let v1 = dir.path().join("out/v1");
        assert!(v1.join("private-params.json").is_file());
        assert!(v1.join("shared-params.json").is_file());
        let manifest = publisher.manifest(ConfigurationVersion::V1).unwrap().unwrap();
        assert_eq!(manifest.version, ConfigurationVersion::V1);
        // nothing staged or retired is left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("out"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn republish_replaces_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = DirectoryPublisher::new(dir.path());
        publisher.publish(&bundle(ConfigurationVersion::V2, "EE")).unwrap();
        let replacement = bundle(ConfigurationVersion::V2, "FI");
        publisher.publish(&replacement).unwrap();

        let written = std::fs::read(dir.path().join("v2/private-params.json")).unwrap();
        let doc: Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(doc["instanceIdentifier"], "FI");
        assert_eq!(
            publisher
                .manifest(ConfigurationVersion::V2)
                .unwrap()
                .unwrap()
                .private_digest,
            *replacement.private_digest()
        );
    }

    #[test]
    fn mark_current_requires_publication() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = DirectoryPublisher::new(dir.path());
        assert_eq!(publisher.current().unwrap(), None);
        assert!(matches!(
            publisher.mark_current(ConfigurationVersion::V1),
            Err(PublishError::NotPublished(_))
        ));

        publisher.publish(&bundle(ConfigurationVersion::V1, "EE")).unwrap();
        publisher.mark_current(ConfigurationVersion::V1).unwrap();
        assert_eq!(publisher.current().unwrap(), Some(ConfigurationVersion::V1));
        assert!(!dir.path().join("current.json.tmp").exists());
    }
}
