//! # Validate Subcommand
//!
//! Checks one parameters document against a configuration version's
//! schema and semantic rules.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use fedconf_core::{ConfigurationVersion, DocumentKind};
use fedconf_schema::ParameterValidator;

use crate::{GlobalOpts, EXIT_OK, EXIT_REJECTED};

/// Arguments for the `fedconf validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Document kind: `private` or `shared`.
    #[arg(long)]
    pub kind: DocumentKind,

    /// Version to validate against. Defaults to the version the document
    /// declares.
    #[arg(long)]
    pub version: Option<ConfigurationVersion>,

    /// The JSON document.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when the document is valid, 1 when it is not, 2 when
/// it cannot be read.
pub fn run_validate(args: &ValidateArgs, _global: &GlobalOpts) -> Result<u8> {
    let validator = ParameterValidator::new().context("failed to load parameter schemas")?;
    let bytes = std::fs::read(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let document: Value = match serde_json::from_slice(&bytes) {
        Ok(document) => document,
        Err(e) => {
            println!("FAIL: {}: not a JSON document: {e}", args.path.display());
            return Ok(EXIT_REJECTED);
        }
    };

    let version = match args.version {
        Some(version) => version,
        None => match declared_version(&document) {
            Some(version) => version,
            None => {
                println!(
                    "FAIL: {}: no valid \"version\" field; pass --version",
                    args.path.display()
                );
                return Ok(EXIT_REJECTED);
            }
        },
    };

    match validator.validate_value(args.kind, version, &document) {
        Ok(()) => {
            println!("OK: {} is valid {} parameters {version}", args.path.display(), args.kind);
            Ok(EXIT_OK)
        }
        Err(e) => {
            println!("FAIL: {}: {e}", args.path.display());
            for violation in e.violations() {
                println!("  {violation}");
            }
            Ok(EXIT_REJECTED)
        }
    }
}

fn declared_version(document: &Value) -> Option<ConfigurationVersion> {
    let n = document.get("version")?.as_u64()?;
    ConfigurationVersion::new(u32::try_from(n).ok()?).ok()
}
