//! The update pipeline.
//!
//! A run walks a fixed sequence of stages: load the credential,
//! authenticate, fetch the catalog, gate on the local marker, download,
//! extract, build, harvest, and commit. Any failure stops the run at that
//! stage and is returned to the caller; the marker is only written once
//! everything before it has succeeded.
//!
//! Collaborators that reach outside the process (the release service, the
//! archive extractor, and the build step runner) are injected so that each
//! stage can be exercised in isolation.

use crate::build::{BuildDuration, StepRunner, run_build};
use crate::bundle::SourceBundle;
use crate::config::RunSettings;
use crate::credential::load_credential;
use crate::error::{AgentError, Result};
use crate::extraction::{Extractor, clear_working_tree, unpack_bundle};
use crate::harvest::Harvester;
use crate::marker::{GateDecision, VersionMarker};
use crate::output::{
    build_success_message, finished_message, up_to_date_message, updating_message,
    write_stderr_line,
};
use crate::release::ReleaseService;
use camino::Utf8PathBuf;
use log::{info, warn};
use std::io::Write;

/// Terminal state of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The marker already records the published version or a newer one.
    UpToDate {
        /// The published version.
        version: u64,
    },
    /// A newer version is published but no catalog entry matched the
    /// artifact pattern.
    NoArtifact {
        /// The published version.
        version: u64,
    },
    /// A new version was built, harvested, and recorded.
    Committed {
        /// The version now recorded in the marker.
        version: u64,
        /// The version recorded before this run, if any.
        previous: Option<u64>,
        /// How long the build took.
        elapsed: BuildDuration,
        /// Paths of the harvested binaries.
        binaries: Vec<Utf8PathBuf>,
    },
}

/// A single update run over injected collaborators.
pub struct Pipeline<'a> {
    settings: &'a RunSettings,
    service: &'a dyn ReleaseService,
    extractor: &'a dyn Extractor,
    runner: &'a dyn StepRunner,
    quiet: bool,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline over the given settings and collaborators.
    #[must_use]
    pub fn new(
        settings: &'a RunSettings,
        service: &'a dyn ReleaseService,
        extractor: &'a dyn Extractor,
        runner: &'a dyn StepRunner,
    ) -> Self {
        Self {
            settings,
            service,
            extractor,
            runner,
            quiet: false,
        }
    }

    /// Suppress progress messages.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Execute the run, writing progress lines to `progress`.
    ///
    /// # Errors
    ///
    /// Returns the [`AgentError`] of the first stage that failed. The
    /// version marker is unchanged whenever an error is returned.
    pub fn run(&self, progress: &mut dyn Write) -> Result<RunOutcome> {
        let paths = &self.settings.paths;
        let credential = load_credential(&paths.credential_file)?;

        self.report(progress, "Requesting token...");
        let token = self
            .service
            .authenticate(&credential)
            .map_err(|source| AgentError::Authentication { source })?;

        self.report(progress, "Downloading latest build info...");
        let catalog = self
            .service
            .fetch_catalog()
            .map_err(|source| AgentError::Catalog { source })?;
        let version = catalog.version;

        let marker = VersionMarker::new(paths.marker_file.clone());
        let previous = match GateDecision::evaluate(marker.read()?, version) {
            GateDecision::UpToDate { current } => {
                info!("marker {current} is at or past published version {version}");
                self.report(progress, up_to_date_message(version));
                return Ok(RunOutcome::UpToDate { version });
            }
            GateDecision::Proceed { previous } => previous,
        };
        self.report(progress, updating_message(version, previous));

        let Some(descriptor) = catalog.select(&self.settings.pattern) else {
            warn!(
                "catalog version {version} lists no artifact matching {}",
                self.settings.pattern.as_str()
            );
            self.report(
                progress,
                format!("No source bundle found for version {version}; nothing to build."),
            );
            return Ok(RunOutcome::NoArtifact { version });
        };
        let bundle = SourceBundle::resolve(descriptor, &paths.download_dir, &paths.source_dir)
            .map_err(|e| AgentError::InvalidArtifact {
                name: descriptor.name.clone(),
                reason: e.to_string(),
            })?;

        self.report(progress, format!("Downloading {}...", bundle.name()));
        self.service
            .download_artifact(bundle.url(), &token, bundle.archive_path().as_std_path())
            .map_err(|source| AgentError::Download {
                name: bundle.name().to_owned(),
                source,
            })?;

        self.report(progress, "Extracting...");
        unpack_bundle(self.extractor, &bundle, &paths.source_dir)?;

        self.report(progress, "Building...");
        let build = run_build(&self.settings.plan, bundle.source_root(), self.runner)?;
        self.report(progress, build_success_message(build.elapsed));

        self.report(progress, "Moving binaries...");
        let harvester = Harvester::new(paths.output_dir.clone(), self.settings.binaries.clone());
        harvester.prepare()?;
        let binaries = harvester.harvest(&build.binary_dir)?;

        self.report(progress, "Writing version...");
        marker.commit(version)?;

        self.report(progress, "Removing source folder...");
        if let Err(err) = clear_working_tree(&paths.source_dir) {
            warn!("version {version} committed but {} was not removed: {err}", paths.source_dir);
        }

        self.report(progress, finished_message(&paths.output_dir));
        Ok(RunOutcome::Committed {
            version,
            previous,
            elapsed: build.elapsed,
            binaries,
        })
    }

    fn report(&self, progress: &mut dyn Write, message: impl std::fmt::Display) {
        if !self.quiet {
            write_stderr_line(progress, message);
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
