//! Configuration version 2.
//!
//! Adds to v1: every verification certificate of a source, the operator's
//! own security servers in private parameters, certificate profiles on
//! approved CAs and declared member classes in shared parameters.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use fedconf_core::{
    ConfigurationVersion, DocumentKind, ParameterValidationError, PrivateParametersDocument,
    SharedParametersDocument,
};
use fedconf_schema::ParameterValidator;

use crate::body;
use crate::generator::{ConfigurationGenerator, GenerationError};
use crate::registry::RegistrySnapshot;

/// Profile recorded for CAs registered without one.
pub const DEFAULT_CERTIFICATE_PROFILE: &str = "fedconf.profile.Default";

/// Generator for configuration version 2.
#[derive(Debug, Clone)]
pub struct V2Generator {
    validator: Arc<ParameterValidator>,
}

impl V2Generator {
    /// A v2 generator validating with `validator`.
    pub fn new(validator: Arc<ParameterValidator>) -> Self {
        Self { validator }
    }
}

impl ConfigurationGenerator for V2Generator {
    fn version(&self) -> ConfigurationVersion {
        ConfigurationVersion::V2
    }

    fn generate_private_parameters(
        &self,
        snapshot: &RegistrySnapshot,
    ) -> Result<PrivateParametersDocument, GenerationError> {
        let operator = snapshot.operator();

        // Servers without an authentication certificate are not yet usable.
        let servers = body::sorted_servers(
            snapshot
                .security_servers
                .iter()
                .filter(|s| &s.owner == operator && !s.auth_certs.is_empty()),
        );
        let Some(first) = servers.first() else {
            return Err(body::unrepresentable(
                DocumentKind::Private,
                self.version(),
                "securityServers",
                format!("operator {operator} has no security server with an authentication certificate"),
            ));
        };
        let server_code = match &snapshot.management_service.security_server {
            Some(code) if servers.iter().any(|s| &s.server_code == code) => code.clone(),
            Some(code) => {
                return Err(body::unrepresentable(
                    DocumentKind::Private,
                    self.version(),
                    "managementService.securityServer",
                    format!(
                        "server \"{code}\" is not a security server of operator {operator} \
                         with an authentication certificate"
                    ),
                ))
            }
            None => first.server_code.clone(),
        };

        body::require_sources(self.version(), snapshot)?;
        let interval = body::positive_seconds(
            DocumentKind::Private,
            self.version(),
            "globalSettings.timeStampingIntervalSeconds",
            snapshot.global_settings.time_stamping_interval_seconds,
        )?;

        let mut sources: Vec<_> = snapshot.configuration_sources.iter().enumerate().collect();
        sources.sort_by(|(_, a), (_, b)| a.download_url.cmp(&b.download_url));
        let mut anchor_sources = Vec::with_capacity(sources.len());
        for (i, source) in sources {
            if source.verification_certs.is_empty() {
                return Err(body::unrepresentable(
                    DocumentKind::Private,
                    self.version(),
                    format!("configurationSources[{i}]"),
                    "source has no verification certificate",
                ));
            }
            let mut certs: Vec<String> = source
                .verification_certs
                .iter()
                .map(|c| c.to_base64())
                .collect();
            certs.sort();
            certs.dedup();
            anchor_sources.push(json!({
                "downloadUrl": source.download_url,
                "verificationCerts": certs,
            }));
        }

        let servers: Vec<_> = servers
            .into_iter()
            .map(|s| {
                json!({
                    "owner": s.owner,
                    "serverCode": s.server_code,
                    "address": s.address,
                    "authCertHashes": body::auth_cert_hashes(s),
                })
            })
            .collect();

        let management = &snapshot.management_service;
        let content = json!({
            "instanceIdentifier": snapshot.instance_identifier,
            "operator": operator,
            "securityServers": servers,
            "configurationAnchor": {"sources": anchor_sources},
            "managementService": {
                "authCertRegServiceAddress": management.auth_cert_reg_service_address,
                "authCertRegServiceCert": management.auth_cert_reg_service_cert,
                "managementRequestServiceProviderId": management.service_provider,
                "managementRequestServiceServerCode": server_code,
            },
            "timeStampingIntervalSeconds": interval,
        });
        Ok(PrivateParametersDocument::new(
            self.version(),
            Utc::now(),
            body::into_map(content),
        ))
    }

    fn validate_private_parameters(
        &self,
        doc: &PrivateParametersDocument,
    ) -> Result<(), ParameterValidationError> {
        self.validator.validate_private(doc, self.version())
    }

    fn generate_shared_parameters(
        &self,
        snapshot: &RegistrySnapshot,
    ) -> Result<SharedParametersDocument, GenerationError> {
        let freshness = body::positive_seconds(
            DocumentKind::Shared,
            self.version(),
            "globalSettings.ocspFreshnessSeconds",
            snapshot.global_settings.ocsp_freshness_seconds,
        )?;
        let mut classes: Vec<_> = snapshot.member_classes.iter().collect();
        classes.sort_by(|a, b| a.code.cmp(&b.code));
        let classes: Vec<_> = classes
            .into_iter()
            .map(|c| json!({"code": c.code, "description": c.description}))
            .collect();

        let content = json!({
            "instanceIdentifier": snapshot.instance_identifier,
            "approvedCAs": body::approved_cas(snapshot, Some(DEFAULT_CERTIFICATE_PROFILE)),
            "approvedTSAs": body::approved_tsas(snapshot),
            "members": body::members(snapshot),
            "securityServers": body::security_servers(snapshot),
            "globalGroups": body::global_groups(snapshot),
            "globalSettings": {
                "ocspFreshnessSeconds": freshness,
                "memberClasses": classes,
            },
        });
        Ok(SharedParametersDocument::new(
            self.version(),
            Utc::now(),
            body::into_map(content),
        ))
    }

    fn validate_shared_parameters(
        &self,
        doc: &SharedParametersDocument,
    ) -> Result<(), ParameterValidationError> {
        self.validator.validate_shared(doc, self.version())
    }
}
