//! Agent configuration.
//!
//! Settings are read from `relbuild.toml` (or the file passed with
//! `--config`) and fall back to built-in defaults for anything omitted.
//! Every table rejects unknown keys so that typos fail loudly instead of
//! silently reverting to a default.
//!
//! ```toml
//! [service]
//! catalog_url = "https://releases.example.test/downloads/"
//!
//! [artifact]
//! pattern = '^pkg-source-[0-9]+\.tar\.zst$'
//!
//! [paths]
//! output_dir = "bin"
//!
//! [build]
//! compile = ["ninja", "-j8"]
//! binaries = ["pkg"]
//! ```

use crate::build::{BuildPlan, BuildStep};
use crate::error::{AgentError, Result};
use crate::harvest::DEFAULT_BINARIES;
use crate::release::{ArtifactPattern, ServiceEndpoints, catalog::DEFAULT_ARTIFACT_PATTERN};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;

/// File name looked up in the base directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "relbuild.toml";

/// Top-level configuration file contents.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Release service endpoints and headers.
    pub service: ServiceConfig,
    /// Source bundle selection.
    pub artifact: ArtifactConfig,
    /// Local file and directory locations.
    pub paths: PathsConfig,
    /// Build commands and outputs.
    pub build: BuildConfig,
}

/// The `[service]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Token-exchange endpoint.
    pub auth_url: String,
    /// Catalog endpoint.
    pub catalog_url: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Header carrying the credential principal.
    pub principal_header: String,
    /// Header carrying the credential secret.
    pub secret_header: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let endpoints = ServiceEndpoints::default();
        Self {
            auth_url: endpoints.auth_url,
            catalog_url: endpoints.catalog_url,
            user_agent: endpoints.user_agent,
            principal_header: endpoints.principal_header,
            secret_header: endpoints.secret_header,
        }
    }
}

impl ServiceConfig {
    /// Convert into client endpoint settings.
    #[must_use]
    pub fn endpoints(&self) -> ServiceEndpoints {
        ServiceEndpoints {
            auth_url: self.auth_url.clone(),
            catalog_url: self.catalog_url.clone(),
            user_agent: self.user_agent.clone(),
            principal_header: self.principal_header.clone(),
            secret_header: self.secret_header.clone(),
        }
    }
}

/// The `[artifact]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactConfig {
    /// Regular expression matched against catalog file names.
    pub pattern: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_ARTIFACT_PATTERN.to_owned(),
        }
    }
}

/// The `[paths]` table. Relative paths resolve against the base directory.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Encoded credential file.
    pub credential_file: Utf8PathBuf,
    /// Last-built version marker.
    pub marker_file: Utf8PathBuf,
    /// Working tree the bundle is extracted into.
    pub source_dir: Utf8PathBuf,
    /// Directory receiving the harvested binaries.
    pub output_dir: Utf8PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            credential_file: Utf8PathBuf::from("TOKEN"),
            marker_file: Utf8PathBuf::from("last_downloaded_ver.txt"),
            source_dir: Utf8PathBuf::from("src"),
            output_dir: Utf8PathBuf::from("build"),
        }
    }
}

/// The `[build]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Build directory relative to the extracted source root.
    pub build_subdir: String,
    /// Binary directory relative to the build directory.
    pub binary_subdir: String,
    /// Configure step argv.
    pub configure: Vec<String>,
    /// Compile step argv.
    pub compile: Vec<String>,
    /// Binary names to harvest.
    pub binaries: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let plan = BuildPlan::default();
        Self {
            build_subdir: plan.build_subdir,
            binary_subdir: plan.binary_subdir,
            configure: argv(&plan.configure),
            compile: argv(&plan.compile),
            binaries: DEFAULT_BINARIES.iter().map(|b| (*b).to_owned()).collect(),
        }
    }
}

fn argv(step: &BuildStep) -> Vec<String> {
    std::iter::once(step.program.clone())
        .chain(step.args.iter().cloned())
        .collect()
}

/// Path settings given on the command line, taking precedence over the file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PathOverrides {
    /// Replacement for `paths.credential_file`.
    pub credential_file: Option<Utf8PathBuf>,
    /// Replacement for `paths.marker_file`.
    pub marker_file: Option<Utf8PathBuf>,
    /// Replacement for `paths.output_dir`.
    pub output_dir: Option<Utf8PathBuf>,
}

impl AgentConfig {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the text is not valid TOML
    /// or contains unknown keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use relbuild_agent::config::AgentConfig;
    ///
    /// let config = AgentConfig::from_toml_str("[paths]\noutput_dir = \"out\"\n")?;
    /// assert_eq!(config.paths.output_dir, "out");
    /// assert_eq!(config.paths.marker_file, "last_downloaded_ver.txt");
    /// # Ok::<(), relbuild_agent::error::AgentError>(())
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source)
            .map_err(|e| AgentError::configuration(format!("invalid configuration: {e}")))
    }

    /// Load configuration for a run rooted at `base_dir`.
    ///
    /// An explicit path must exist. Without one, `relbuild.toml` in
    /// `base_dir` is used when present, and defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the file cannot be read or
    /// parsed.
    pub fn load(explicit: Option<&Utf8Path>, base_dir: &Utf8Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_owned(),
            None => {
                let implicit = base_dir.join(DEFAULT_CONFIG_FILE);
                if !implicit.is_file() {
                    debug!("no {DEFAULT_CONFIG_FILE} in {base_dir}; using defaults");
                    return Ok(Self::default());
                }
                implicit
            }
        };

        debug!("loading configuration from {path}");
        let source = std::fs::read_to_string(&path).map_err(|e| {
            AgentError::configuration(format!("failed to read configuration {path}: {e}"))
        })?;
        toml::from_str(&source)
            .map_err(|e| AgentError::configuration(format!("invalid configuration {path}: {e}")))
    }

    /// Apply command-line path overrides.
    pub fn apply_overrides(&mut self, overrides: &PathOverrides) {
        if let Some(path) = &overrides.credential_file {
            self.paths.credential_file.clone_from(path);
        }
        if let Some(path) = &overrides.marker_file {
            self.paths.marker_file.clone_from(path);
        }
        if let Some(path) = &overrides.output_dir {
            self.paths.output_dir.clone_from(path);
        }
    }

    /// Validate the configuration and resolve it into run settings.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the artifact pattern does not
    /// compile, a build step argv is empty, or no binaries are listed.
    pub fn settings(&self, base_dir: &Utf8Path) -> Result<RunSettings> {
        let pattern = ArtifactPattern::new(&self.artifact.pattern).map_err(|e| {
            AgentError::configuration(format!("invalid artifact pattern: {e}"))
        })?;
        let configure = step_from_config("configure", &self.build.configure)?;
        let compile = step_from_config("compile", &self.build.compile)?;
        if self.build.binaries.is_empty() {
            return Err(AgentError::configuration(
                "build.binaries must name at least one binary",
            ));
        }

        Ok(RunSettings {
            endpoints: self.service.endpoints(),
            pattern,
            paths: RunPaths::resolve(&self.paths, base_dir),
            plan: BuildPlan {
                build_subdir: self.build.build_subdir.clone(),
                binary_subdir: self.build.binary_subdir.clone(),
                configure,
                compile,
            },
            binaries: self.build.binaries.clone(),
        })
    }
}

fn step_from_config(name: &str, argv: &[String]) -> Result<BuildStep> {
    BuildStep::from_argv(name, argv).ok_or_else(|| {
        AgentError::configuration(format!("build.{name} must name a program to run"))
    })
}

/// Absolute locations used by a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunPaths {
    /// Directory every relative path is resolved against.
    pub base_dir: Utf8PathBuf,
    /// Encoded credential file.
    pub credential_file: Utf8PathBuf,
    /// Last-built version marker.
    pub marker_file: Utf8PathBuf,
    /// Working tree the bundle is extracted into.
    pub source_dir: Utf8PathBuf,
    /// Directory receiving the harvested binaries.
    pub output_dir: Utf8PathBuf,
    /// Directory the archive is downloaded into.
    pub download_dir: Utf8PathBuf,
}

impl RunPaths {
    /// Resolve configured paths against `base_dir`.
    ///
    /// Absolute paths are kept as they are.
    #[must_use]
    pub fn resolve(paths: &PathsConfig, base_dir: &Utf8Path) -> Self {
        Self {
            base_dir: base_dir.to_owned(),
            credential_file: base_dir.join(&paths.credential_file),
            marker_file: base_dir.join(&paths.marker_file),
            source_dir: base_dir.join(&paths.source_dir),
            output_dir: base_dir.join(&paths.output_dir),
            download_dir: base_dir.to_owned(),
        }
    }
}

/// Validated settings for one pipeline run.
#[derive(Clone, Debug)]
pub struct RunSettings {
    /// Release service endpoints.
    pub endpoints: ServiceEndpoints,
    /// Compiled source bundle pattern.
    pub pattern: ArtifactPattern,
    /// Resolved locations.
    pub paths: RunPaths,
    /// Build steps and layout.
    pub plan: BuildPlan,
    /// Binary names to harvest.
    pub binaries: Vec<String>,
}
