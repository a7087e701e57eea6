//! # Generate Subcommand
//!
//! Runs one generation against a registry export and publishes into the
//! output directory.
//!
//! Exit codes: 0 when every version published and the current version was
//! marked, 1 when any version was rejected or the run was cancelled, 2 when
//! no version is eligible to be current or the run could not execute.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use fedconf_core::ConfigurationVersion;
use fedconf_gen::{
    CancellationFlag, DirectoryPublisher, FileRegistry, GenerationOrchestrator, GeneratorSet,
    RunReport, RunState, VersionPolicy, VersionState,
};
use fedconf_schema::ParameterValidator;

use crate::config::Settings;
use crate::{GlobalOpts, EXIT_FAULT, EXIT_OK, EXIT_REJECTED};

/// Arguments for the `fedconf generate` subcommand.
#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Registry export to generate from (YAML or JSON).
    #[arg(long, value_name = "PATH")]
    pub registry: Option<PathBuf>,

    /// Hold a version back from becoming current. Repeatable; replaces the
    /// configured list.
    #[arg(long = "hold-back", value_name = "VERSION")]
    pub hold_back: Vec<ConfigurationVersion>,

    /// Generate versions one at a time.
    #[arg(long)]
    pub sequential: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

/// Execute the generate subcommand.
pub fn run_generate(args: &GenerateArgs, global: &GlobalOpts) -> Result<u8> {
    let mut settings = Settings::load(global.config.as_deref())?;
    if let Some(registry) = &args.registry {
        settings.registry = Some(registry.clone());
    }
    if let Some(output) = &global.output_dir {
        settings.output_dir = Some(output.clone());
    }
    if !args.hold_back.is_empty() {
        settings.held_back_versions = args.hold_back.clone();
    }
    if args.sequential {
        settings.parallel = false;
    }

    let registry_path = settings
        .registry
        .clone()
        .context("no registry configured (use --registry, FEDCONF_REGISTRY or the config file)")?;
    let output_dir = settings
        .output_dir
        .clone()
        .context("no output directory configured (use --output-dir, FEDCONF_OUTPUT_DIR or the config file)")?;

    let report = execute(&settings, registry_path, output_dir)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(exit_code(&report))
}

/// Build the pipeline from `settings` and run it once.
pub fn execute(
    settings: &Settings,
    registry_path: PathBuf,
    output_dir: PathBuf,
) -> Result<RunReport> {
    let validator = Arc::new(ParameterValidator::new().context("failed to load parameter schemas")?);
    let mut generators = GeneratorSet::with_builtin(Arc::clone(&validator));
    for (version, eligible) in &settings.eligible_for_current {
        generators
            .set_eligibility(*version, *eligible)
            .with_context(|| format!("eligibility override for {version}"))?;
    }
    let policy = VersionPolicy::with_held_back(settings.held_back_versions.iter().copied());

    tracing::info!(
        registry = %registry_path.display(),
        output = %output_dir.display(),
        parallel = settings.parallel,
        "running generation"
    );

    let mut orchestrator = GenerationOrchestrator::new(
        FileRegistry::new(registry_path),
        generators,
        validator,
        policy,
        DirectoryPublisher::new(output_dir),
    );
    if !settings.parallel {
        orchestrator = orchestrator.sequential();
    }
    Ok(orchestrator.run(&CancellationFlag::new())?)
}

/// Map a run report to a process exit code.
pub fn exit_code(report: &RunReport) -> u8 {
    if report.fault.is_some() {
        return EXIT_FAULT;
    }
    let all_published = report
        .outcomes
        .iter()
        .all(|o| o.state == VersionState::Published);
    if report.state == RunState::Completed && all_published && report.current_marked {
        EXIT_OK
    } else {
        EXIT_REJECTED
    }
}

fn print_report(report: &RunReport) {
    if let Some(fault) = &report.fault {
        println!("FAULT: {fault}");
        return;
    }
    for outcome in &report.outcomes {
        match (&outcome.rejection, &outcome.shared_digest) {
            (Some(rejection), _) => println!(
                "  {}: REJECTED at {}: {}",
                outcome.version, rejection.stage, rejection.error
            ),
            (None, Some(digest)) if outcome.state == VersionState::Published => {
                println!("  {}: published (shared {digest})", outcome.version)
            }
            _ => println!("  {}: {:?}", outcome.version, outcome.state),
        }
    }
    match (report.current_version, report.current_marked) {
        (Some(v), true) => println!("Current version: {v}"),
        (Some(v), false) => println!("Current version {v} not published; index unchanged"),
        (None, _) => {}
    }
}

/// Comma-separated version list for display.
pub(crate) fn versions_label(versions: &[ConfigurationVersion]) -> String {
    versions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
