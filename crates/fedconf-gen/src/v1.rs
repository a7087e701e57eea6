//! Configuration version 1.
//!
//! Private parameters carry one verification certificate per configuration
//! source. Shared parameters have no member class declarations and no
//! certificate profiles.

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

/// Generator for configuration version 1.
#[derive(Debug, Clone)]
pub struct V1Generator {
    validator: Arc<ParameterValidator>,
}

impl V1Generator {
    /// A v1 generator validating with `validator`.
    pub fn new(validator: Arc<ParameterValidator>) -> Self {
        Self { validator }
    }
}

impl ConfigurationGenerator for V1Generator {
    fn version(&self) -> ConfigurationVersion {
        ConfigurationVersion::V1
    }

    fn generate_private_parameters(
        &self,
        snapshot: &RegistrySnapshot,
    ) -> Result<PrivateParametersDocument, GenerationError> {
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
            // v1 has room for one certificate; the first registered wins.
            let Some(cert) = source.verification_certs.first() else {
                return Err(body::unrepresentable(
                    DocumentKind::Private,
                    self.version(),
                    format!("configurationSources[{i}]"),
                    "source has no verification certificate",
                ));
            };
            if source.verification_certs.len() > 1 {
                tracing::debug!(
                    url = %source.download_url,
                    dropped = source.verification_certs.len() - 1,
                    "v1 keeps only the first verification certificate"
                );
            }
            anchor_sources.push(json!({
                "downloadUrl": source.download_url,
                "verificationCert": cert,
            }));
        }

        let management = &snapshot.management_service;
        let content = json!({
            "instanceIdentifier": snapshot.instance_identifier,
            "configurationAnchor": {"sources": anchor_sources},
            "managementService": {
                "authCertRegServiceAddress": management.auth_cert_reg_service_address,
                "authCertRegServiceCert": management.auth_cert_reg_service_cert,
                "managementRequestServiceProviderId": management.service_provider,
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
        let content = json!({
            "instanceIdentifier": snapshot.instance_identifier,
            "approvedCAs": body::approved_cas(snapshot, None),
            "approvedTSAs": body::approved_tsas(snapshot),
            "members": body::members(snapshot),
            "securityServers": body::security_servers(snapshot),
            "globalGroups": body::global_groups(snapshot),
            "globalSettings": {
                "ocspFreshnessSeconds": freshness,
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
