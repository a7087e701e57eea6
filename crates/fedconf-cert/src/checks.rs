//! # Specific Certificate Checks
//!
//! The size/parse gate in [`CertificateValidator`](crate::CertificateValidator)
//! only guarantees a well-formed, size-bounded certificate. Validators for a
//! particular upload (a CA certificate, a TSA certificate, …) refine that
//! with a [`CertificateCheck`].

use chrono::{DateTime, Utc};

use crate::parse::ValidatedCertificate;

/// A structural check applied after a certificate parsed successfully.
///
/// Returning `Err(reason)` rejects the certificate as invalid; `reason` is
/// shown to the operator.
pub trait CertificateCheck: Send + Sync {
    /// Inspect a parsed certificate.
    fn check(&self, cert: &ValidatedCertificate) -> Result<(), String>;
}

/// No additional checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralCertificate;

impl CertificateCheck for GeneralCertificate {
    fn check(&self, _cert: &ValidatedCertificate) -> Result<(), String> {
        Ok(())
    }
}

/// Requires a certification authority certificate: basicConstraints cA set
/// and, when a key usage extension is present, `keyCertSign`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaCertificate;

impl CertificateCheck for CaCertificate {
    fn check(&self, cert: &ValidatedCertificate) -> Result<(), String> {
        if !cert.is_ca {
            return Err(format!(
                "certificate \"{}\" is not a CA certificate (basicConstraints cA is not set)",
                cert.subject
            ));
        }
        match cert.key_usage {
            Some(usage) if !usage.key_cert_sign => Err(format!(
                "CA certificate \"{}\" does not permit keyCertSign",
                cert.subject
            )),
            _ => Ok(()),
        }
    }
}

/// Requires the validity window to contain a given instant.
#[derive(Debug, Clone, Copy)]
pub struct ValidAt(pub DateTime<Utc>);

impl ValidAt {
    /// Check against the current time.
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl CertificateCheck for ValidAt {
    fn check(&self, cert: &ValidatedCertificate) -> Result<(), String> {
        if self.0 < cert.not_before {
            return Err(format!("certificate is not valid before {}", cert.not_before));
        }
        if self.0 > cert.not_after {
            return Err(format!("certificate expired at {}", cert.not_after));
        }
        Ok(())
    }
}

/// Applies two checks in order; the first rejection wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct Both<A, B>(pub A, pub B);

impl<A: CertificateCheck, B: CertificateCheck> CertificateCheck for Both<A, B> {
    fn check(&self, cert: &ValidatedCertificate) -> Result<(), String> {
        self.0.check(cert)?;
        self.1.check(cert)
    }
}
