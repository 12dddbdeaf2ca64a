//! CLI argument definitions for the relbuild agent.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::PathOverrides;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use log::LevelFilter;

/// Rebuild the latest published source release when it changes.
#[derive(Parser, Debug)]
#[command(name = "relbuild")]
#[command(version, about)]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = concat!(
    "Rebuild the latest published source release when it changes.\n\n",
    "Each run authenticates with the release service, compares the published ",
    "version with the one recorded in the local marker file, and, when a newer ",
    "version exists, downloads the source bundle, builds it with the configured ",
    "toolchain, and moves the resulting binaries into the output directory.\n\n",
    "Paths are resolved against the base directory, which defaults to the current ",
    "directory. Settings are read from relbuild.toml in the base directory when ",
    "present.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Check for and build a new release:\n",
    "    $ relbuild\n\n",
    "  Run against another directory with verbose logging:\n",
    "    $ relbuild --base-dir /srv/relbuild -vv\n\n",
    "  Show local and published versions without building:\n",
    "    $ relbuild status\n",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Run arguments (used when no subcommand is given).
    ///
    /// These cannot be combined with a subcommand; flags for `run` or
    /// `status` go after the subcommand name.
    #[command(flatten)]
    pub run: RunArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check for a new release and build it (default when no subcommand given).
    Run(RunArgs),

    /// Show local and published versions without authenticating or building.
    Status(RunArgs),
}

/// Arguments shared by every command.
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Configuration file [default: <BASE_DIR>/relbuild.toml when present].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Directory relative paths are resolved against [default: current directory].
    #[arg(short = 'C', long, value_name = "DIR")]
    pub base_dir: Option<Utf8PathBuf>,

    /// Encoded credential file [default: TOKEN].
    #[arg(long, value_name = "FILE")]
    pub credential_file: Option<Utf8PathBuf>,

    /// Version marker file [default: last_downloaded_ver.txt].
    #[arg(long, value_name = "FILE")]
    pub marker_file: Option<Utf8PathBuf>,

    /// Directory receiving built binaries [default: build].
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl RunArgs {
    /// Path overrides to apply on top of the configuration file.
    #[must_use]
    pub fn path_overrides(&self) -> PathOverrides {
        PathOverrides {
            credential_file: self.credential_file.clone(),
            marker_file: self.marker_file.clone(),
            output_dir: self.output_dir.clone(),
        }
    }

    /// Log level selected by `-v` flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use log::LevelFilter;
    /// use relbuild_agent::cli::RunArgs;
    ///
    /// let args = RunArgs { verbosity: 2, ..RunArgs::default() };
    /// assert_eq!(args.log_level(), LevelFilter::Debug);
    /// ```
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

impl Cli {
    /// Returns the effective run arguments.
    ///
    /// If a subcommand was provided, returns its arguments. Otherwise returns
    /// the flattened arguments.
    #[must_use]
    pub fn run_args(&self) -> &RunArgs {
        match &self.command {
            Some(Command::Run(args) | Command::Status(args)) => args,
            None => &self.run,
        }
    }

    /// Whether the status command was requested.
    #[must_use]
    pub fn is_status(&self) -> bool {
        matches!(self.command, Some(Command::Status(_)))
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
