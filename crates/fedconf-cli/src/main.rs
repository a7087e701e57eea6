//! # fedconf CLI entry point
//!
//! Parses command-line arguments, initializes logging from the verbosity
//! flag, and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fedconf_cli::cert::{run_cert, CertArgs};
use fedconf_cli::generate::{run_generate, GenerateArgs};
use fedconf_cli::registry::{run_registry, RegistryArgs};
use fedconf_cli::validate::{run_validate, ValidateArgs};
use fedconf_cli::{GlobalOpts, EXIT_FAULT};

/// Federation trust-configuration toolchain.
///
/// Generates versioned private and shared parameters from a registry export,
/// validates parameters documents and certificates, and publishes bundles.
#[derive(Parser, Debug)]
#[command(name = "fedconf", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit log lines as JSON on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output directory for published bundles.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate, validate and publish every registered configuration version.
    Generate(GenerateArgs),

    /// Validate a private or shared parameters document.
    Validate(ValidateArgs),

    /// Certificate operations.
    Cert(CertArgs),

    /// Registry export operations.
    Registry(RegistryArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Without -v, RUST_LOG decides.
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "fedconf starting");

    let global = GlobalOpts {
        config: cli.config,
        output_dir: cli.output_dir,
    };

    let result = match cli.command {
        Commands::Generate(args) => run_generate(&args, &global),
        Commands::Validate(args) => run_validate(&args, &global),
        Commands::Cert(args) => run_cert(&args, &global),
        Commands::Registry(args) => run_registry(&args, &global),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FAULT)
        }
    }
}
