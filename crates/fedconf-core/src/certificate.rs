//! DER certificate bytes as they appear in registry state and in generated
//! documents. Serialized as standard base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::digest::sha256_hex;
use crate::error::ValidationError;

/// Upper bound on certificate input, in bytes. Anything larger is rejected
/// before parsing.
pub const CERT_MAX_BYTES: u64 = 1_000_000;

/// Raw DER-encoded certificate bytes.
///
/// Holding a `CertificateBytes` says nothing about well-formedness; that is
/// established by the certificate validator.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CertificateBytes(Vec<u8>);

impl CertificateBytes {
    /// Wrap DER bytes.
    pub fn new(der: impl Into<Vec<u8>>) -> Self {
        Self(der.into())
    }

    /// Decode from standard base64.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidBase64`] when `encoded` is not
    /// valid base64.
    pub fn from_base64(encoded: &str) -> Result<Self, ValidationError> {
        STANDARD
            .decode(encoded.trim())
            .map(Self)
            .map_err(|e| ValidationError::InvalidBase64(e.to_string()))
    }

    /// Encode as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Lowercase hex SHA-256 of the DER bytes.
    pub fn sha256_hex(&self) -> String {
        sha256_hex(&self.0)
    }

    /// The DER bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of DER bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no bytes are held.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for CertificateBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CertificateBytes({} bytes, sha256={})", self.0.len(), self.sha256_hex())
    }
}

impl AsRef<[u8]> for CertificateBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for CertificateBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for CertificateBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_serde() {
        let cert = CertificateBytes::new(vec![0x30, 0x82, 0x01, 0x0a]);
        let json = serde_json::to_string(&cert).unwrap();
        assert_eq!(json, "\"MIIBCg==\"");
        let back: CertificateBytes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cert);
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(serde_json::from_str::<CertificateBytes>("\"***\"").is_err());
    }

    #[test]
    fn debug_does_not_dump_bytes() {
        let cert = CertificateBytes::new(vec![1u8; 64]);
        let dbg = format!("{cert:?}");
        assert!(dbg.contains("64 bytes"));
    }
}
