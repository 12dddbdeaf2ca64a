//! relbuild CLI entrypoint.
//!
//! This binary checks the release service for a newer published version and,
//! when one exists, downloads, builds, and harvests it. Failures are mapped
//! to the process exit code in one place.

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use relbuild_agent::build::SystemStepRunner;
use relbuild_agent::cli::{Cli, RunArgs};
use relbuild_agent::config::{AgentConfig, RunSettings};
use relbuild_agent::error::{AgentError, Result};
use relbuild_agent::extraction::TarExtractor;
use relbuild_agent::output::write_stderr_line;
use relbuild_agent::pipeline::{Pipeline, RunOutcome};
use relbuild_agent::release::HttpReleaseService;
use relbuild_agent::status::StatusReport;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.run_args());
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Initialise `env_logger` at the level chosen by `-v`, letting `RUST_LOG`
/// override it.
fn init_logging(args: &RunArgs) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(args.log_level()).parse_default_env();
    if builder.try_init().is_err() {
        // A logger is already installed; keep it.
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let args = cli.run_args();
    let settings = load_settings(args)?;
    let service = HttpReleaseService::new(settings.endpoints.clone());

    if cli.is_status() {
        let report = StatusReport::collect(&settings, &service)?;
        writeln!(std::io::stdout().lock(), "{report}")?;
        return Ok(());
    }

    let outcome = Pipeline::new(&settings, &service, &TarExtractor, &SystemStepRunner)
        .quiet(args.quiet)
        .run(stderr)?;
    match outcome {
        RunOutcome::Committed { version, .. } => info!("committed version {version}"),
        RunOutcome::UpToDate { version } => info!("already at version {version}"),
        RunOutcome::NoArtifact { version } => info!("nothing to build for version {version}"),
    }
    Ok(())
}

/// Resolves the base directory, loads configuration, and applies CLI
/// overrides.
fn load_settings(args: &RunArgs) -> Result<RunSettings> {
    let base_dir = resolve_base_dir(args.base_dir.clone())?;
    let mut config = AgentConfig::load(args.config.as_deref(), &base_dir)?;
    config.apply_overrides(&args.path_overrides());
    config.settings(&base_dir)
}

fn resolve_base_dir(cli_base_dir: Option<Utf8PathBuf>) -> Result<Utf8PathBuf> {
    if let Some(dir) = cli_base_dir {
        return Ok(dir);
    }
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::try_from(cwd).map_err(|e| AgentError::Configuration {
        reason: format!("current directory is not valid UTF-8: {e}"),
    })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, &err);
            err.exit_code()
        }
    }
}
