//! Persisted "last built version" marker and the version gate.
//!
//! The marker is a text file holding one decimal integer. It is only written
//! after a fully successful build and harvest, which makes it the single
//! durability point of a run.

use crate::error::{AgentError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::ErrorKind;

/// The on-disk version marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMarker {
    path: Utf8PathBuf,
}

impl VersionMarker {
    /// Create a marker backed by the file at `path`.
    #[must_use]
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    /// Return the backing file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Read the recorded version.
    ///
    /// A missing, empty, or whitespace-only file means no version has been
    /// built yet.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the file holds anything other
    /// than a non-negative integer, and [`AgentError::Io`] if it cannot be
    /// read.
    pub fn read(&self) -> Result<Option<u64>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AgentError::Io(err)),
        };
        parse_marker(&contents).map_err(|reason| {
            AgentError::configuration(format!("version marker {}: {reason}", self.path))
        })
    }

    /// Replace the recorded version with `version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn commit(&self, version: u64) -> Result<()> {
        std::fs::write(&self.path, version.to_string())?;
        Ok(())
    }
}

fn parse_marker(contents: &str) -> std::result::Result<Option<u64>, String> {
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| format!("expected an integer version, found {trimmed:?}"))
}

/// Result of comparing the local marker with the published version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The local build is at or ahead of the published version.
    UpToDate {
        /// The version recorded locally.
        current: u64,
    },
    /// A newer version is published and should be built.
    Proceed {
        /// The version recorded locally, if any.
        previous: Option<u64>,
    },
}

impl GateDecision {
    /// Decide whether `published` should be built given the local `marker`.
    ///
    /// # Examples
    ///
    /// ```
    /// use relbuild_agent::marker::GateDecision;
    ///
    /// assert_eq!(
    ///     GateDecision::evaluate(Some(5), 5),
    ///     GateDecision::UpToDate { current: 5 },
    /// );
    /// assert_eq!(
    ///     GateDecision::evaluate(None, 5),
    ///     GateDecision::Proceed { previous: None },
    /// );
    /// ```
    #[must_use]
    pub fn evaluate(marker: Option<u64>, published: u64) -> Self {
        match marker {
            Some(current) if current >= published => Self::UpToDate { current },
            previous => Self::Proceed { previous },
        }
    }
}
