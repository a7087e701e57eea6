//! # Registry Subcommand
//!
//! Loads a registry export, verifies every certificate it holds, and
//! dry-runs generation and validation for each registered version. Nothing
//! is published.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use fedconf_core::ConfigurationVersion;
use fedconf_gen::{
    FileRegistry, GeneratorError, GeneratorSet, Registry, RegistryError, RegistrySnapshot,
};
use fedconf_schema::ParameterValidator;

use crate::config::Settings;
use crate::generate::versions_label;
use crate::{GlobalOpts, EXIT_OK, EXIT_REJECTED};

/// Arguments for the `fedconf registry` subcommand.
#[derive(Args, Debug)]
pub struct RegistryArgs {
    #[command(subcommand)]
    pub command: RegistryCommand,
}

/// Registry export operations.
#[derive(Subcommand, Debug)]
pub enum RegistryCommand {
    /// Check an export and dry-run every configuration version.
    Check {
        /// Registry export (YAML or JSON). Defaults to the configured registry.
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

/// Execute the registry subcommand.
///
/// Returns exit code: 0 when the export is usable by every version, 1 when a
/// certificate or a version was rejected, 2 when the export cannot be read.
pub fn run_registry(args: &RegistryArgs, global: &GlobalOpts) -> Result<u8> {
    match &args.command {
        RegistryCommand::Check { path } => {
            let path = match path {
                Some(path) => path.clone(),
                None => Settings::load(global.config.as_deref())?
                    .registry
                    .context("no registry given and none configured")?,
            };
            run_check(path)
        }
    }
}

fn run_check(path: PathBuf) -> Result<u8> {
    let registry = FileRegistry::new(&path);
    let snapshot = match registry.snapshot() {
        Ok(snapshot) => snapshot,
        Err(RegistryError::Certificate(e)) => {
            println!("FAIL: {}: {e}", path.display());
            return Ok(EXIT_REJECTED);
        }
        Err(e) => return Err(e.into()),
    };

    let validator = Arc::new(ParameterValidator::new().context("failed to load parameter schemas")?);
    let generators = GeneratorSet::with_builtin(validator);

    println!(
        "Registry {} (instance {}): {} members, {} security servers",
        path.display(),
        snapshot.instance_identifier,
        snapshot.members.len(),
        snapshot.security_servers.len(),
    );

    let mut rejected = Vec::new();
    for version in generators.versions() {
        match dry_run(&generators, version, &snapshot) {
            Ok(()) => println!("  {version}: OK"),
            Err(e) => {
                println!("  {version}: FAIL: {e}");
                rejected.push(version);
            }
        }
    }

    if rejected.is_empty() {
        Ok(EXIT_OK)
    } else {
        println!("Rejected versions: {}", versions_label(&rejected));
        Ok(EXIT_REJECTED)
    }
}

fn dry_run(
    generators: &GeneratorSet,
    version: ConfigurationVersion,
    snapshot: &RegistrySnapshot,
) -> Result<(), GeneratorError> {
    let private = generators.generate_private_parameters(version, snapshot)?;
    generators.validate_private_parameters(version, &private)?;
    let shared = generators.generate_shared_parameters(version, snapshot)?;
    generators.validate_shared_parameters(version, &shared)?;
    tracing::debug!(%version, "dry run passed");
    Ok(())
}
