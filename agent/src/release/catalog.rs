//! Release catalog model and source-bundle selection.
//!
//! The catalog endpoint returns JSON of the form:
//!
//! ```json
//! {
//!   "version": 4012,
//!   "files": [
//!     { "name": "yuzu-windows-msvc-source-20231102-4f1c2e3.tar.xz", "url": "https://..." }
//!   ]
//! }
//! ```
//!
//! Fields beyond `version`, `files`, `name`, and `url` are ignored.

use regex::Regex;
use serde::Deserialize;

/// Default pattern identifying the source bundle in the catalog.
pub const DEFAULT_ARTIFACT_PATTERN: &str = r"^yuzu-windows-msvc-source-[0-9]*-[0-9a-f]*\.tar\.xz$";

/// The currently published release and its downloadable artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseCatalog {
    /// Monotonically increasing published version number.
    pub version: u64,
    /// Downloadable artifacts, in the order the service lists them.
    #[serde(default)]
    pub files: Vec<ArtifactDescriptor>,
}

/// A single downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtifactDescriptor {
    /// File name of the artifact.
    pub name: String,
    /// Download URL for the artifact.
    pub url: String,
}

impl ReleaseCatalog {
    /// Parse a catalog from the service's JSON response.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the body is not a valid catalog.
    ///
    /// # Examples
    ///
    /// ```
    /// use relbuild_agent::release::ReleaseCatalog;
    ///
    /// let catalog = ReleaseCatalog::from_json(
    ///     r#"{"version": 42, "files": [{"name": "a.tar.xz", "url": "https://example.test/a"}]}"#,
    /// )?;
    /// assert_eq!(catalog.version, 42);
    /// assert_eq!(catalog.files.len(), 1);
    /// # Ok::<(), serde_json::Error>(())
    /// ```
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Return the first artifact whose name matches `pattern`.
    #[must_use]
    pub fn select(&self, pattern: &ArtifactPattern) -> Option<&ArtifactDescriptor> {
        self.files.iter().find(|file| pattern.matches(&file.name))
    }
}

/// Compiled name pattern identifying the source bundle.
#[derive(Debug, Clone)]
pub struct ArtifactPattern(Regex);

impl ArtifactPattern {
    /// Compile a pattern from a regular expression.
    ///
    /// # Errors
    ///
    /// Returns a [`regex::Error`] if the expression does not compile.
    pub fn new(expression: &str) -> Result<Self, regex::Error> {
        Regex::new(expression).map(Self)
    }

    /// Whether `name` matches this pattern.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.0.is_match(name)
    }

    /// The source expression.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}
