//! # Certificate Validator
//!
//! Gatekeeper for certificate material entering or leaving the registry.
//!
//! ## Security invariant
//!
//! Input larger than [`CERT_MAX_BYTES`] is rejected from its metadata alone:
//! the file is never opened for reading and no parser sees it. Input within
//! the limit is read with a hard cap so a file that grows between the size
//! check and the read cannot slip through.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use fedconf_core::{CertificateError, InvalidCertificateDetail, CERT_MAX_BYTES};

use crate::checks::{CaCertificate, CertificateCheck, GeneralCertificate};
use crate::parse::{parse_certificate, ValidatedCertificate};

/// Validates uploaded certificate files.
///
/// The type parameter is the specific check applied after parsing; the
/// default performs none.
#[derive(Debug, Clone, Default)]
pub struct CertificateValidator<C = GeneralCertificate> {
    check: C,
}

impl CertificateValidator<GeneralCertificate> {
    /// A validator for general certificates.
    pub fn new() -> Self {
        Self {
            check: GeneralCertificate,
        }
    }
}

impl CertificateValidator<CaCertificate> {
    /// A validator for certification authority certificates.
    pub fn for_ca() -> Self {
        Self {
            check: CaCertificate,
        }
    }
}

impl<C: CertificateCheck> CertificateValidator<C> {
    /// A validator applying `check` after the size/parse gate.
    pub fn with_check(check: C) -> Self {
        Self { check }
    }

    /// Validate the certificate stored at `path`.
    ///
    /// `original_filename` is only echoed in errors; it never influences
    /// how the content is interpreted.
    ///
    /// # Errors
    ///
    /// - [`CertificateError::CertificateTooLarge`] if the file exceeds the
    ///   byte cap.
    /// - [`CertificateError::InvalidCertificate`] for unreadable files,
    ///   parse failures, and rejections by the specific check.
    pub fn validate(
        &self,
        path: &Path,
        original_filename: &str,
    ) -> Result<ValidatedCertificate, CertificateError> {
        let size = std::fs::metadata(path)
            .map_err(|e| {
                tracing::debug!(path = %path.display(), error = %e, "certificate metadata unavailable");
                invalid(original_filename, InvalidCertificateDetail::Malformed)
            })?
            .len();
        ensure_within_limit(size, original_filename)?;

        let mut bytes = Vec::new();
        File::open(path)
            .and_then(|file| file.take(CERT_MAX_BYTES + 1).read_to_end(&mut bytes))
            .map_err(|e| {
                tracing::debug!(path = %path.display(), error = %e, "certificate read failed");
                invalid(original_filename, InvalidCertificateDetail::Malformed)
            })?;

        self.validate_bytes(&bytes, original_filename)
    }

    /// Validate certificate bytes already in memory.
    ///
    /// # Errors
    ///
    /// Same as [`validate`](Self::validate).
    pub fn validate_bytes(
        &self,
        bytes: &[u8],
        original_filename: &str,
    ) -> Result<ValidatedCertificate, CertificateError> {
        ensure_within_limit(bytes.len() as u64, original_filename)?;

        let cert = parse_certificate(bytes).map_err(|detail| invalid(original_filename, detail))?;

        self.check.check(&cert).map_err(|reason| {
            tracing::debug!(filename = original_filename, %reason, "certificate rejected by check");
            invalid(original_filename, InvalidCertificateDetail::Check(reason))
        })?;

        tracing::debug!(
            filename = original_filename,
            subject = %cert.subject,
            fingerprint = %cert.fingerprint_sha256,
            "certificate accepted"
        );
        Ok(cert)
    }
}

fn ensure_within_limit(size: u64, filename: &str) -> Result<(), CertificateError> {
    if size > CERT_MAX_BYTES {
        tracing::warn!(filename, size, limit = CERT_MAX_BYTES, "certificate exceeds size limit");
        return Err(CertificateError::CertificateTooLarge {
            filename: filename.to_string(),
            size,
            limit: CERT_MAX_BYTES,
        });
    }
    Ok(())
}

fn invalid(filename: &str, detail: InvalidCertificateDetail) -> CertificateError {
    CertificateError::InvalidCertificate {
        filename: filename.to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how often the post-parse check runs.
    struct CountingCheck<'a>(&'a AtomicUsize);

    impl CertificateCheck for CountingCheck<'_> {
        fn check(&self, _cert: &ValidatedCertificate) -> Result<(), String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn accepts_der_file() {
        let ck = rcgen::generate_simple_self_signed(vec!["a.example".to_string()]).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ck.cert.der()).unwrap();
        let cert = CertificateValidator::new()
            .validate(file.path(), "a.der")
            .unwrap();
        assert_eq!(cert.der.as_bytes(), ck.cert.der().as_ref());
    }

    #[test]
    fn limit_is_inclusive() {
        let exactly = vec![0u8; CERT_MAX_BYTES as usize];
        let err = CertificateValidator::new()
            .validate_bytes(&exactly, "edge.der")
            .unwrap_err();
        assert!(matches!(err, CertificateError::InvalidCertificate { .. }));
    }

    #[test]
    fn oversized_bytes_never_reach_the_check() {
        let calls = AtomicUsize::new(0);
        let validator = CertificateValidator::with_check(CountingCheck(&calls));
        let ck = rcgen::generate_simple_self_signed(vec!["b.example".to_string()]).unwrap();
        let mut padded = ck.cert.pem().into_bytes();
        padded.resize(CERT_MAX_BYTES as usize + 1, b'\n');
        let err = validator.validate_bytes(&padded, "b.pem").unwrap_err();
        assert!(matches!(err, CertificateError::CertificateTooLarge { size, .. } if size == CERT_MAX_BYTES + 1));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        validator.validate_bytes(ck.cert.der(), "b.der").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_file_is_invalid_not_a_panic() {
        let err = CertificateValidator::new()
            .validate(Path::new("/nonexistent/fedconf/cert.pem"), "cert.pem")
            .unwrap_err();
        assert_eq!(
            err,
            CertificateError::InvalidCertificate {
                filename: "cert.pem".to_string(),
                detail: InvalidCertificateDetail::Malformed,
            }
        );
    }

    #[test]
    fn ca_validator_rejects_leaf() {
        let ck = rcgen::generate_simple_self_signed(vec!["leaf.example".to_string()]).unwrap();
        let err = CertificateValidator::for_ca()
            .validate_bytes(ck.cert.der(), "leaf.der")
            .unwrap_err();
        assert!(matches!(
            err,
            CertificateError::InvalidCertificate {
                detail: InvalidCertificateDetail::Check(_),
                ..
            }
        ));
    }
}
