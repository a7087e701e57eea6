#![deny(missing_docs)]

//! # fedconf-cert — Certificate Validation
//!
//! Parses and sanity-checks X.509 certificates supplied as files, under a
//! hard size limit and independent of any configuration version.
//!
//! ## Contract
//!
//! - Input above [`CERT_MAX_BYTES`](fedconf_core::CERT_MAX_BYTES) fails with
//!   `CertificateTooLarge` before any parse.
//! - Every parse failure, whatever its cause, fails with
//!   `InvalidCertificate`. Errors from `x509-parser` and `pem` never leave
//!   this crate.
//! - A [`CertificateCheck`] refines the gate with further structural checks
//!   (CA flag, validity window, …). The default check adds nothing.
//!
//! Validators hold no mutable state and are safe to share across threads.

pub mod checks;
pub mod parse;
pub mod validator;

pub use checks::{Both, CaCertificate, CertificateCheck, GeneralCertificate, ValidAt};
pub use parse::{parse_certificate, parse_der, KeyUsageSummary, ValidatedCertificate};
pub use validator::CertificateValidator;
