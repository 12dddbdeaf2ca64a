//! Error types for the relbuild agent.
//!
//! Every failure in a run is fatal. Each variant names the pipeline stage that
//! failed, and [`AgentError::exit_code`] maps it to the process exit status so
//! that the binary has a single place where errors turn into exits.

use crate::extraction::ExtractionError;
use crate::release::RequestError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The credential, configuration file, or version marker is missing or
    /// malformed.
    #[error("configuration error: {reason}")]
    Configuration {
        /// Description of what was wrong.
        reason: String,
    },

    /// The token exchange was rejected or could not be performed.
    #[error("failed to obtain authorization token: {source}")]
    Authentication {
        /// The underlying request failure.
        #[source]
        source: RequestError,
    },

    /// The release catalog could not be fetched or parsed.
    #[error("failed to fetch release catalog: {source}")]
    Catalog {
        /// The underlying request failure.
        #[source]
        source: RequestError,
    },

    /// The selected catalog entry cannot be used as a source bundle.
    #[error("catalog entry {name} is not a usable source bundle: {reason}")]
    InvalidArtifact {
        /// Name of the rejected catalog entry.
        name: String,
        /// Why the entry was rejected.
        reason: String,
    },

    /// The source bundle download failed.
    #[error("failed to download {name}: {source}")]
    Download {
        /// Name of the artifact being downloaded.
        name: String,
        /// The underlying request failure.
        #[source]
        source: RequestError,
    },

    /// The downloaded archive could not be unpacked.
    #[error("failed to extract {archive}: {source}")]
    Extraction {
        /// Path of the archive being extracted.
        archive: Utf8PathBuf,
        /// The underlying extraction failure.
        #[source]
        source: ExtractionError,
    },

    /// A build step exited unsuccessfully.
    #[error("build step {step} failed ({})", describe_exit(.code.as_ref()))]
    Build {
        /// Name of the failing step (`configure` or `compile`).
        step: String,
        /// Exit code of the step, or `None` when it was killed by a signal.
        code: Option<i32>,
    },

    /// A build step could not be started.
    #[error("failed to start build step {step} ({program}): {source}")]
    BuildSpawn {
        /// Name of the step that could not start.
        step: String,
        /// Program that was invoked.
        program: String,
        /// The underlying spawn failure.
        #[source]
        source: std::io::Error,
    },

    /// The expected build outputs could not be moved into the output
    /// directory.
    #[error("harvest failed: {reason}")]
    Harvest {
        /// Description of the harvest failure.
        reason: String,
    },

    /// An I/O operation outside a specific stage failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Returns the process exit status for this error.
    ///
    /// A failed build step propagates the toolchain's own exit code so that
    /// operators can tell build-tool failure modes apart. Every other error
    /// exits with status 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use relbuild_agent::error::AgentError;
    ///
    /// let err = AgentError::Build { step: "compile".to_owned(), code: Some(2) };
    /// assert_eq!(err.exit_code(), 2);
    ///
    /// let err = AgentError::Configuration { reason: "missing TOKEN".to_owned() };
    /// assert_eq!(err.exit_code(), 1);
    /// ```
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Build {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn harvest(reason: impl Into<String>) -> Self {
        Self::Harvest {
            reason: reason.into(),
        }
    }
}

fn describe_exit(code: Option<&i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_owned(),
    }
}

/// Result type alias using [`AgentError`].
pub type Result<T> = std::result::Result<T, AgentError>;
