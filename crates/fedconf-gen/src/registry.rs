//! # Registry
//!
//! The generation pipeline reads the federation registry through the
//! [`Registry`] trait. Each call to [`Registry::snapshot`] returns an owned,
//! internally consistent [`RegistrySnapshot`]; later registry changes never
//! leak into a snapshot already taken.
//!
//! Two implementations ship here: [`InMemoryRegistry`] for embedding and
//! tests, and [`FileRegistry`] reading a YAML or JSON export. The file
//! registry runs every certificate through the certificate validator on
//! load, so generators only ever see parseable certificate material.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fedconf_cert::CertificateValidator;
use fedconf_core::{CertificateBytes, CertificateError, ClientId, MemberId};

/// Registry access failures.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The registry source could not be read.
    #[error("failed to read registry {path}: {source}")]
    Io {
        /// Path of the registry source.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The registry source is not a well-formed registry document.
    #[error("failed to parse registry {path}: {reason}")]
    Parse {
        /// Path of the registry source.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A certificate held by the registry failed validation.
    #[error("registry certificate rejected: {0}")]
    Certificate(#[from] CertificateError),
}

/// A member class declared by the federation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberClass {
    /// Class code, e.g. `GOV`.
    pub code: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// A registered member and its subsystems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member identifier.
    #[serde(flatten)]
    pub id: MemberId,
    /// Display name.
    pub name: String,
    /// Subsystem codes.
    #[serde(default)]
    pub subsystems: Vec<String>,
}

/// A registered security server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityServer {
    /// Owning member.
    pub owner: MemberId,
    /// Server code, unique per owner.
    pub server_code: String,
    /// Network address.
    pub address: String,
    /// Registered authentication certificates (DER).
    #[serde(default)]
    pub auth_certs: Vec<CertificateBytes>,
    /// Clients served by this server.
    #[serde(default)]
    pub clients: Vec<ClientId>,
}

/// An OCSP responder of a certification authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcspResponder {
    /// Responder URL.
    pub url: String,
    /// Responder signing certificate, when it is not the CA itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<CertificateBytes>,
}

/// A CA certificate with its OCSP responders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaInfo {
    /// CA certificate (DER).
    pub cert: CertificateBytes,
    /// OCSP responders.
    #[serde(default)]
    pub ocsp: Vec<OcspResponder>,
}

/// An approved certification authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationAuthority {
    /// Unique display name.
    pub name: String,
    /// Whether the CA may only issue authentication certificates.
    #[serde(default)]
    pub authentication_only: bool,
    /// Trust anchor.
    pub top_ca: CaInfo,
    /// Intermediate CAs below the anchor.
    #[serde(default)]
    pub intermediate_cas: Vec<CaInfo>,
    /// Certificate profile identifier used by clients to interpret issued
    /// certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_profile_info: Option<String>,
}

/// An approved time-stamping authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampingAuthority {
    /// Display name.
    pub name: String,
    /// Service URL.
    pub url: String,
    /// TSA certificate (DER).
    pub cert: CertificateBytes,
}

/// A federation-wide group of clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalGroup {
    /// Unique group code.
    pub group_code: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Group members.
    #[serde(default)]
    pub members: Vec<ClientId>,
}

/// A location from which security servers download configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSource {
    /// Download URL.
    pub download_url: String,
    /// Certificates verifying configuration signed for this source.
    #[serde(default)]
    pub verification_certs: Vec<CertificateBytes>,
}

/// The operator's management service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementService {
    /// Address of the authentication certificate registration service.
    pub auth_cert_reg_service_address: String,
    /// TLS certificate of the registration service (DER).
    pub auth_cert_reg_service_cert: CertificateBytes,
    /// Subsystem providing the management request service.
    pub service_provider: ClientId,
    /// Security server code hosting the management request service. When
    /// absent, the first of the operator's servers is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_server: Option<String>,
}

fn default_ocsp_freshness() -> u64 {
    600
}

fn default_timestamping_interval() -> u64 {
    60
}

/// Federation-wide tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    /// Maximum age of an OCSP response, in seconds.
    #[serde(default = "default_ocsp_freshness")]
    pub ocsp_freshness_seconds: u64,
    /// Interval between time-stamping batches, in seconds.
    #[serde(default = "default_timestamping_interval")]
    pub time_stamping_interval_seconds: u64,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            ocsp_freshness_seconds: default_ocsp_freshness(),
            time_stamping_interval_seconds: default_timestamping_interval(),
        }
    }
}

/// The registry state as of one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    /// Federation instance identifier.
    pub instance_identifier: String,
    /// Declared member classes.
    #[serde(default)]
    pub member_classes: Vec<MemberClass>,
    /// Registered members.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Registered security servers.
    #[serde(default)]
    pub security_servers: Vec<SecurityServer>,
    /// Approved certification authorities.
    #[serde(default)]
    pub certification_authorities: Vec<CertificationAuthority>,
    /// Approved time-stamping authorities.
    #[serde(default)]
    pub timestamping_authorities: Vec<TimestampingAuthority>,
    /// Global groups.
    #[serde(default)]
    pub global_groups: Vec<GlobalGroup>,
    /// Configuration download sources.
    #[serde(default)]
    pub configuration_sources: Vec<ConfigurationSource>,
    /// The operator's management service.
    pub management_service: ManagementService,
    /// Federation-wide settings.
    #[serde(default)]
    pub global_settings: GlobalSettings,
}

impl RegistrySnapshot {
    /// Every certificate in the snapshot, labelled by its location.
    pub fn certificates(&self) -> Vec<(String, &CertificateBytes)> {
        let mut out = Vec::new();
        for (i, source) in self.configuration_sources.iter().enumerate() {
            for (j, cert) in source.verification_certs.iter().enumerate() {
                out.push((format!("configurationSources[{i}].verificationCerts[{j}]"), cert));
            }
        }
        out.push((
            "managementService.authCertRegServiceCert".to_string(),
            &self.management_service.auth_cert_reg_service_cert,
        ));
        for (i, server) in self.security_servers.iter().enumerate() {
            for (j, cert) in server.auth_certs.iter().enumerate() {
                out.push((format!("securityServers[{i}].authCerts[{j}]"), cert));
            }
        }
        for (i, ca) in self.certification_authorities.iter().enumerate() {
            let cas = std::iter::once(("topCa".to_string(), &ca.top_ca)).chain(
                ca.intermediate_cas
                    .iter()
                    .enumerate()
                    .map(|(k, info)| (format!("intermediateCas[{k}]"), info)),
            );
            for (label, info) in cas {
                let base = format!("certificationAuthorities[{i}].{label}");
                out.push((format!("{base}.cert"), &info.cert));
                for (m, responder) in info.ocsp.iter().enumerate() {
                    if let Some(cert) = &responder.cert {
                        out.push((format!("{base}.ocsp[{m}].cert"), cert));
                    }
                }
            }
        }
        for (i, tsa) in self.timestamping_authorities.iter().enumerate() {
            out.push((format!("timestampingAuthorities[{i}].cert"), &tsa.cert));
        }
        out
    }

    /// The member owning the management service.
    pub fn operator(&self) -> &MemberId {
        self.management_service.service_provider.member()
    }
}

/// Read access to the federation registry.
pub trait Registry: Send + Sync {
    /// Take a consistent snapshot of the current registry state.
    fn snapshot(&self) -> Result<RegistrySnapshot, RegistryError>;
}

/// A registry held in memory.
#[derive(Debug)]
pub struct InMemoryRegistry {
    state: RwLock<RegistrySnapshot>,
}

impl InMemoryRegistry {
    /// Create a registry with the given initial state.
    pub fn new(state: RegistrySnapshot) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Apply a change. Snapshots already taken are unaffected.
    pub fn update(&self, change: impl FnOnce(&mut RegistrySnapshot)) {
        change(&mut self.state.write());
    }
}

impl Registry for InMemoryRegistry {
    fn snapshot(&self) -> Result<RegistrySnapshot, RegistryError> {
        Ok(self.state.read().clone())
    }
}

/// A registry exported to a YAML or JSON file, re-read on every snapshot.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    /// A registry backed by `path`. The file is not read until the first
    /// snapshot.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Registry for FileRegistry {
    fn snapshot(&self) -> Result<RegistrySnapshot, RegistryError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| RegistryError::Io {
            path: self.path.clone(),
            source,
        })?;
        let is_json = self
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let snapshot: RegistrySnapshot = if is_json {
            serde_json::from_str(&text).map_err(|e| RegistryError::Parse {
                path: self.path.clone(),
                reason: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&text).map_err(|e| RegistryError::Parse {
                path: self.path.clone(),
                reason: e.to_string(),
            })?
        };
        verify_certificates(&snapshot)?;
        tracing::debug!(
            path = %self.path.display(),
            members = snapshot.members.len(),
            servers = snapshot.security_servers.len(),
            "loaded registry snapshot"
        );
        Ok(snapshot)
    }
}

/// Run every certificate in `snapshot` through the general certificate
/// validator. The error names the certificate's location in the registry.
pub fn verify_certificates(snapshot: &RegistrySnapshot) -> Result<(), RegistryError> {
    let validator = CertificateValidator::new();
    for (label, cert) in snapshot.certificates() {
        validator.validate_bytes(cert.as_bytes(), &label)?;
    }
    Ok(())
}
