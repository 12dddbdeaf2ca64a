//! Build orchestration for extracted source trees.
//!
//! A build is a fixed pair of steps, configure then compile, each run as a
//! direct child process inside `<source_root>/<build_subdir>`. Compile only
//! runs when configure succeeds.

mod elapsed;
mod stream;

pub use elapsed::BuildDuration;
pub use stream::{SystemStepRunner, run_streaming};

use crate::error::{AgentError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use std::process::ExitStatus;
use std::time::Instant;

/// A single external command in the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    /// Step name used in logs and errors (`configure`, `compile`).
    pub name: String,
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl BuildStep {
    /// Create a step from a name and an argv list.
    ///
    /// Returns `None` when `argv` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use relbuild_agent::build::BuildStep;
    ///
    /// let step = BuildStep::from_argv("compile", &["ninja".to_owned(), "-j4".to_owned()])
    ///     .expect("non-empty argv");
    /// assert_eq!(step.program, "ninja");
    /// assert_eq!(step.args, vec!["-j4"]);
    /// assert!(BuildStep::from_argv("compile", &[]).is_none());
    /// ```
    #[must_use]
    pub fn from_argv(name: &str, argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            name: name.to_owned(),
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Render the step as a shell-like command line for logging.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Layout and commands for building a source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// Directory, relative to the source root, the steps run in.
    pub build_subdir: String,
    /// Directory, relative to the build directory, holding the binaries.
    pub binary_subdir: String,
    /// The configure step.
    pub configure: BuildStep,
    /// The compile step.
    pub compile: BuildStep,
}

impl Default for BuildPlan {
    fn default() -> Self {
        Self {
            build_subdir: "build".to_owned(),
            binary_subdir: "bin".to_owned(),
            configure: BuildStep {
                name: "configure".to_owned(),
                program: "cmake".to_owned(),
                args: vec!["..".to_owned(), "-GNinja".to_owned()],
            },
            compile: BuildStep {
                name: "compile".to_owned(),
                program: "ninja".to_owned(),
                args: Vec::new(),
            },
        }
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Wall-clock time from the first spawn until the last step exited.
    pub elapsed: BuildDuration,
    /// Directory the steps ran in.
    pub build_dir: Utf8PathBuf,
    /// Directory holding the produced binaries.
    pub binary_dir: Utf8PathBuf,
}

/// Trait for running build steps, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait StepRunner {
    /// Run `step` to completion inside `working_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the step cannot be spawned or waited on. A step
    /// that runs and fails is reported through the returned status.
    fn run(&self, step: &BuildStep, working_dir: &Utf8Path) -> std::io::Result<ExitStatus>;
}

/// Run `plan` against the extracted tree at `source_root`.
///
/// # Errors
///
/// Returns [`AgentError::Io`] if the build directory cannot be created,
/// [`AgentError::BuildSpawn`] if a step cannot be started, and
/// [`AgentError::Build`] carrying the step's exit code if it fails.
pub fn run_build(
    plan: &BuildPlan,
    source_root: &Utf8Path,
    runner: &dyn StepRunner,
) -> Result<BuildReport> {
    let build_dir = source_root.join(&plan.build_subdir);
    std::fs::create_dir_all(&build_dir)?;

    let started = Instant::now();
    for step in [&plan.configure, &plan.compile] {
        info!("build step {}: {}", step.name, step.command_line());
        let status = runner
            .run(step, &build_dir)
            .map_err(|source| AgentError::BuildSpawn {
                step: step.name.clone(),
                program: step.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(AgentError::Build {
                step: step.name.clone(),
                code: status.code(),
            });
        }
    }
    let elapsed = BuildDuration::from(started.elapsed());

    let binary_dir = build_dir.join(&plan.binary_subdir);
    Ok(BuildReport {
        elapsed,
        build_dir,
        binary_dir,
    })
}
