//! # Cert Subcommand
//!
//! Runs a certificate file through the same gate an upload passes:
//! size cap first, then parsing, then the check selected by flags.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use fedconf_cert::{
    Both, CaCertificate, CertificateCheck, CertificateValidator, GeneralCertificate, ValidAt,
    ValidatedCertificate,
};
use fedconf_core::CertificateError;

use crate::{GlobalOpts, EXIT_OK, EXIT_REJECTED};

/// Arguments for the `fedconf cert` subcommand.
#[derive(Args, Debug)]
pub struct CertArgs {
    #[command(subcommand)]
    pub command: CertCommand,
}

/// Certificate operations.
#[derive(Subcommand, Debug)]
pub enum CertCommand {
    /// Validate a certificate file (PEM or DER).
    Validate(CertValidateArgs),
}

/// Arguments for `fedconf cert validate`.
#[derive(Args, Debug)]
pub struct CertValidateArgs {
    /// Certificate file.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Original file name reported in errors. Defaults to the file name of
    /// PATH.
    #[arg(long)]
    pub name: Option<String>,

    /// Require a certification authority certificate.
    #[arg(long)]
    pub ca: bool,

    /// Require the certificate to be valid now.
    #[arg(long)]
    pub current: bool,

    /// Print the certificate summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the cert subcommand.
///
/// Returns exit code: 0 for an accepted certificate, 1 for a rejected one.
pub fn run_cert(args: &CertArgs, _global: &GlobalOpts) -> Result<u8> {
    match &args.command {
        CertCommand::Validate(args) => run_cert_validate(args),
    }
}

fn run_cert_validate(args: &CertValidateArgs) -> Result<u8> {
    let name = args.name.clone().unwrap_or_else(|| {
        args.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.path.display().to_string())
    });

    let result = match (args.ca, args.current) {
        (false, false) => validate_with(GeneralCertificate, args, &name),
        (true, false) => validate_with(CaCertificate, args, &name),
        (false, true) => validate_with(ValidAt::now(), args, &name),
        (true, true) => validate_with(Both(CaCertificate, ValidAt::now()), args, &name),
    };

    match result {
        Ok(cert) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&cert)?);
            } else {
                println!("OK: {name}");
                println!("  subject:     {}", cert.subject);
                println!("  issuer:      {}", cert.issuer);
                println!("  serial:      {}", cert.serial);
                println!("  valid:       {} .. {}", cert.not_before, cert.not_after);
                println!("  ca:          {}", cert.is_ca);
                println!("  sha256:      {}", cert.fingerprint_sha256);
            }
            Ok(EXIT_OK)
        }
        Err(e) => {
            println!("FAIL: {e}");
            Ok(EXIT_REJECTED)
        }
    }
}

fn validate_with<C: CertificateCheck>(
    check: C,
    args: &CertValidateArgs,
    name: &str,
) -> Result<ValidatedCertificate, CertificateError> {
    CertificateValidator::with_check(check).validate(&args.path, name)
}
