//! # Certificate Parsing
//!
//! The only place `x509-parser` and `pem` are touched. Every failure they
//! report collapses into [`InvalidCertificateDetail::Malformed`]; callers
//! receive an owned [`ValidatedCertificate`] that does not borrow the input.

use chrono::{DateTime, Utc};
use serde::Serialize;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use fedconf_core::{sha256_hex, CertificateBytes, InvalidCertificateDetail};

const PEM_CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Key usage bits relevant to trust decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyUsageSummary {
    /// `digitalSignature`
    pub digital_signature: bool,
    /// `keyCertSign`
    pub key_cert_sign: bool,
    /// `cRLSign`
    pub crl_sign: bool,
}

/// A certificate that passed the size gate and parsed as exactly one X.509
/// structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedCertificate {
    /// The DER encoding (PEM input is decoded).
    #[serde(skip)]
    pub der: CertificateBytes,
    /// Subject distinguished name.
    pub subject: String,
    /// Issuer distinguished name.
    pub issuer: String,
    /// Serial number as colon-separated hex.
    pub serial: String,
    /// Start of the validity window.
    pub not_before: DateTime<Utc>,
    /// End of the validity window.
    pub not_after: DateTime<Utc>,
    /// basicConstraints cA flag.
    pub is_ca: bool,
    /// Key usage extension, when present.
    pub key_usage: Option<KeyUsageSummary>,
    /// Lowercase hex SHA-256 of the DER bytes.
    pub fingerprint_sha256: String,
}

impl ValidatedCertificate {
    /// Whether subject and issuer are the same name.
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    /// Whether `at` falls inside the validity window (inclusive).
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

/// Parse PEM or DER input holding exactly one certificate.
///
/// # Errors
///
/// Returns [`InvalidCertificateDetail::Malformed`] for anything else.
pub fn parse_certificate(bytes: &[u8]) -> Result<ValidatedCertificate, InvalidCertificateDetail> {
    if looks_like_pem(bytes) {
        let der = decode_single_pem(bytes)?;
        parse_der(&der)
    } else {
        parse_der(bytes)
    }
}

/// Parse a DER-encoded certificate. Trailing bytes are rejected.
///
/// # Errors
///
/// Returns [`InvalidCertificateDetail::Malformed`] when the bytes are not
/// exactly one certificate.
pub fn parse_der(der: &[u8]) -> Result<ValidatedCertificate, InvalidCertificateDetail> {
    let (remaining, cert) = X509Certificate::from_der(der).map_err(|e| {
        tracing::debug!(error = %e, "X.509 DER parse failed");
        InvalidCertificateDetail::Malformed
    })?;
    if !remaining.is_empty() {
        tracing::debug!(trailing = remaining.len(), "trailing bytes after certificate");
        return Err(InvalidCertificateDetail::Malformed);
    }

    let validity = cert.validity();
    let not_before = DateTime::<Utc>::from_timestamp(validity.not_before.timestamp(), 0)
        .ok_or(InvalidCertificateDetail::Malformed)?;
    let not_after = DateTime::<Utc>::from_timestamp(validity.not_after.timestamp(), 0)
        .ok_or(InvalidCertificateDetail::Malformed)?;

    // A duplicated or undecodable extension is a structural defect.
    let key_usage = cert
        .key_usage()
        .map_err(|_| InvalidCertificateDetail::Malformed)?
        .map(|ext| KeyUsageSummary {
            digital_signature: ext.value.digital_signature(),
            key_cert_sign: ext.value.key_cert_sign(),
            crl_sign: ext.value.crl_sign(),
        });

    Ok(ValidatedCertificate {
        der: CertificateBytes::new(der.to_vec()),
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        serial: cert.raw_serial_as_string(),
        not_before,
        not_after,
        is_ca: cert.is_ca(),
        key_usage,
        fingerprint_sha256: sha256_hex(der),
    })
}

fn looks_like_pem(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"-----BEGIN")
}

fn decode_single_pem(bytes: &[u8]) -> Result<Vec<u8>, InvalidCertificateDetail> {
    let blocks = pem::parse_many(bytes).map_err(|e| {
        tracing::debug!(error = %e, "PEM decode failed");
        InvalidCertificateDetail::Malformed
    })?;
    match blocks.as_slice() {
        [block] if block.tag() == PEM_CERTIFICATE_TAG => Ok(block.contents().to_vec()),
        [block] => {
            tracing::debug!(tag = block.tag(), "unexpected PEM tag");
            Err(InvalidCertificateDetail::Malformed)
        }
        _ => {
            tracing::debug!(blocks = blocks.len(), "expected exactly one PEM block");
            Err(InvalidCertificateDetail::Malformed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn self_signed() -> rcgen::CertifiedKey {
        rcgen::generate_simple_self_signed(vec!["cs.example.org".to_string()]).unwrap()
    }

    #[test]
    fn parses_der() {
        let ck = self_signed();
        let parsed = parse_der(ck.cert.der()).unwrap();
        assert_eq!(parsed.der.as_bytes(), ck.cert.der().as_ref());
        assert_eq!(parsed.fingerprint_sha256.len(), 64);
        assert!(parsed.not_before < parsed.not_after);
        assert!(!parsed.is_ca);
    }

    #[test]
    fn parses_pem_with_leading_whitespace() {
        let ck = self_signed();
        let pem = format!("\n  {}", ck.cert.pem());
        let parsed = parse_certificate(pem.as_bytes()).unwrap();
        assert_eq!(parsed.der.as_bytes(), ck.cert.der().as_ref());
    }

    #[test]
    fn rejects_trailing_bytes() {
        let ck = self_signed();
        let mut der = ck.cert.der().to_vec();
        der.extend_from_slice(&[0, 0, 0]);
        assert_eq!(parse_der(&der), Err(InvalidCertificateDetail::Malformed));
    }

    #[test]
    fn rejects_truncated_der() {
        let ck = self_signed();
        let der = ck.cert.der();
        let truncated = &der[..der.len() / 2];
        assert_eq!(parse_der(truncated), Err(InvalidCertificateDetail::Malformed));
    }

    #[test]
    fn rejects_two_pem_blocks() {
        let a = self_signed().cert.pem();
        let b = self_signed().cert.pem();
        let both = format!("{a}{b}");
        assert_eq!(
            parse_certificate(both.as_bytes()),
            Err(InvalidCertificateDetail::Malformed)
        );
    }

    #[test]
    fn rejects_non_certificate_pem_tag() {
        let ck = self_signed();
        let key_pem = ck.key_pair.serialize_pem();
        assert_eq!(
            parse_certificate(key_pem.as_bytes()),
            Err(InvalidCertificateDetail::Malformed)
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(parse_certificate(b""), Err(InvalidCertificateDetail::Malformed));
    }
}
