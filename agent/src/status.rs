//! Read-only status report.
//!
//! Compares the local marker with the published catalog without
//! authenticating, downloading, or building anything.

use crate::config::RunSettings;
use crate::error::{AgentError, Result};
use crate::marker::{GateDecision, VersionMarker};
use crate::release::ReleaseService;
use std::fmt;

/// Local and published version state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Version recorded in the local marker, if any.
    pub local: Option<u64>,
    /// Version currently published in the catalog.
    pub published: u64,
    /// Name of the catalog entry matching the artifact pattern, if any.
    pub artifact: Option<String>,
}

impl StatusReport {
    /// Gather the report using `service` for the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Catalog`] if the catalog cannot be fetched and
    /// [`AgentError::Configuration`] if the marker is malformed.
    pub fn collect(settings: &RunSettings, service: &dyn ReleaseService) -> Result<Self> {
        let catalog = service
            .fetch_catalog()
            .map_err(|source| AgentError::Catalog { source })?;
        let local = VersionMarker::new(settings.paths.marker_file.clone()).read()?;
        let artifact = catalog
            .select(&settings.pattern)
            .map(|descriptor| descriptor.name.clone());

        Ok(Self {
            local,
            published: catalog.version,
            artifact,
        })
    }

    /// Whether a run would build a new version.
    #[must_use]
    pub fn update_available(&self) -> bool {
        self.artifact.is_some()
            && matches!(
                GateDecision::evaluate(self.local, self.published),
                GateDecision::Proceed { .. }
            )
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.local {
            Some(local) => writeln!(f, "Local version: {local}")?,
            None => writeln!(f, "Local version: none")?,
        }
        writeln!(f, "Published version: {}", self.published)?;
        match &self.artifact {
            Some(name) => writeln!(f, "Source bundle: {name}")?,
            None => writeln!(f, "Source bundle: no matching artifact")?,
        }
        let verdict = if self.update_available() { "yes" } else { "no" };
        write!(f, "Update available: {verdict}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::release::ReleaseCatalog;
    use crate::release::client::MockReleaseService;
    use crate::test_utils::{SOURCE_BUNDLE_NAME, StubReleaseService, ServiceCall};
    use camino::Utf8PathBuf;
    use rstest::rstest;

    fn settings_in(temp: &tempfile::TempDir) -> RunSettings {
        let base = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        AgentConfig::default().settings(&base).expect("settings")
    }

    #[rstest]
    #[case::fresh(None, 3, true)]
    #[case::behind(Some("2"), 3, true)]
    #[case::current(Some("3"), 3, false)]
    fn reports_update_availability(
        #[case] marker: Option<&str>,
        #[case] published: u64,
        #[case] available: bool,
    ) {
        let temp = tempfile::tempdir().expect("temp dir");
        let settings = settings_in(&temp);
        if let Some(contents) = marker {
            std::fs::write(&settings.paths.marker_file, contents).expect("marker");
        }
        let service = StubReleaseService::publishing(published);

        let report = StatusReport::collect(&settings, &service).expect("status");

        assert_eq!(report.published, published);
        assert_eq!(report.artifact.as_deref(), Some(SOURCE_BUNDLE_NAME));
        assert_eq!(report.update_available(), available);
        assert_eq!(service.calls(), vec![ServiceCall::FetchCatalog]);
    }

    #[test]
    fn no_matching_artifact_means_no_update() {
        let temp = tempfile::tempdir().expect("temp dir");
        let settings = settings_in(&temp);
        let service = StubReleaseService::new(ReleaseCatalog {
            version: 9,
            files: Vec::new(),
        });

        let report = StatusReport::collect(&settings, &service).expect("status");

        assert!(!report.update_available());
        assert!(report.to_string().contains("no matching artifact"));
    }

    #[test]
    fn never_authenticates() {
        let temp = tempfile::tempdir().expect("temp dir");
        let settings = settings_in(&temp);
        let mut service = MockReleaseService::new();
        service.expect_authenticate().never();
        service.expect_download_artifact().never();
        service.expect_fetch_catalog().times(1).returning(|| {
            Ok(ReleaseCatalog {
                version: 1,
                files: Vec::new(),
            })
        });

        StatusReport::collect(&settings, &service).expect("status");
    }

    #[test]
    fn display_lists_versions() {
        let report = StatusReport {
            local: Some(4),
            published: 5,
            artifact: Some("pkg-5.tar.xz".to_owned()),
        };
        let text = report.to_string();
        assert!(text.contains("Local version: 4"));
        assert!(text.contains("Published version: 5"));
        assert!(text.ends_with("Update available: yes"));
    }
}
