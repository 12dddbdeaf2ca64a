//! Source bundle descriptor.
//!
//! A [`SourceBundle`] is resolved once from the selected catalog entry and
//! carries every path later stages need: where the archive is downloaded,
//! how it is compressed, and where its extracted source root will live.

use crate::release::ArtifactDescriptor;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// Outer compression of a tar source bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.tar.xz` / `.txz`
    TarXz,
    /// `.tar.zst` / `.tzst`
    TarZstd,
    /// `.tar.gz` / `.tgz`
    TarGzip,
}

/// Recognised archive suffixes, longest first within each format.
const SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.xz", ArchiveFormat::TarXz),
    (".txz", ArchiveFormat::TarXz),
    (".tar.zst", ArchiveFormat::TarZstd),
    (".tzst", ArchiveFormat::TarZstd),
    (".tar.gz", ArchiveFormat::TarGzip),
    (".tgz", ArchiveFormat::TarGzip),
];

impl ArchiveFormat {
    /// Split an archive file name into its stem and format.
    ///
    /// Returns `None` when the name has no recognised suffix or nothing
    /// precedes the suffix.
    ///
    /// # Examples
    ///
    /// ```
    /// use relbuild_agent::bundle::ArchiveFormat;
    ///
    /// assert_eq!(
    ///     ArchiveFormat::split_name("source-123-abc.tar.xz"),
    ///     Some(("source-123-abc", ArchiveFormat::TarXz)),
    /// );
    /// assert_eq!(ArchiveFormat::split_name("source.zip"), None);
    /// ```
    #[must_use]
    pub fn split_name(name: &str) -> Option<(&str, Self)> {
        SUFFIXES.iter().find_map(|(suffix, format)| {
            name.strip_suffix(suffix)
                .filter(|stem| !stem.is_empty())
                .map(|stem| (stem, *format))
        })
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TarXz => "tar.xz",
            Self::TarZstd => "tar.zst",
            Self::TarGzip => "tar.gz",
        };
        f.write_str(label)
    }
}

/// Errors rejecting a catalog entry as a source bundle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BundleError {
    /// The name is not a plain file name.
    #[error("name must be a plain file name")]
    NotAFileName,

    /// The name has no supported archive suffix.
    #[error("unsupported archive type; expected .tar.xz, .tar.zst, or .tar.gz")]
    UnsupportedFormat,
}

/// A resolved source bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBundle {
    name: String,
    url: String,
    format: ArchiveFormat,
    archive_path: Utf8PathBuf,
    source_root: Utf8PathBuf,
}

impl SourceBundle {
    /// Resolve a catalog entry into a bundle.
    ///
    /// The archive is downloaded to `download_dir/<name>`, and its source
    /// root is `source_dir/<name without archive suffix>`.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::NotAFileName`] if the name contains path
    /// separators or parent components, and
    /// [`BundleError::UnsupportedFormat`] if its suffix is not recognised.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use relbuild_agent::bundle::SourceBundle;
    /// use relbuild_agent::release::ArtifactDescriptor;
    ///
    /// let descriptor = ArtifactDescriptor {
    ///     name: "src-1-ab.tar.xz".to_owned(),
    ///     url: "https://example.test/src-1-ab.tar.xz".to_owned(),
    /// };
    /// let bundle = SourceBundle::resolve(&descriptor, Utf8Path::new("."), Utf8Path::new("src"))?;
    /// assert_eq!(bundle.source_root(), Utf8Path::new("src/src-1-ab"));
    /// # Ok::<(), relbuild_agent::bundle::BundleError>(())
    /// ```
    pub fn resolve(
        descriptor: &ArtifactDescriptor,
        download_dir: &Utf8Path,
        source_dir: &Utf8Path,
    ) -> Result<Self, BundleError> {
        let name = descriptor.name.as_str();
        if !is_plain_file_name(name) {
            return Err(BundleError::NotAFileName);
        }
        let (stem, format) = ArchiveFormat::split_name(name).ok_or(BundleError::UnsupportedFormat)?;

        Ok(Self {
            name: name.to_owned(),
            url: descriptor.url.clone(),
            format,
            archive_path: download_dir.join(name),
            source_root: source_dir.join(stem),
        })
    }

    /// The artifact file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The download URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The outer compression format.
    #[must_use]
    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Where the archive is written by the download.
    #[must_use]
    pub fn archive_path(&self) -> &Utf8Path {
        &self.archive_path
    }

    /// The directory the archive's top-level source tree extracts to.
    #[must_use]
    pub fn source_root(&self) -> &Utf8Path {
        &self.source_root
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Utf8Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(camino::Utf8Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn descriptor(name: &str) -> ArtifactDescriptor {
        ArtifactDescriptor {
            name: name.to_owned(),
            url: format!("https://example.test/{name}"),
        }
    }

    #[rstest]
    #[case::xz("a-1.tar.xz", "a-1", ArchiveFormat::TarXz)]
    #[case::txz("a-1.txz", "a-1", ArchiveFormat::TarXz)]
    #[case::zstd("a-1.tar.zst", "a-1", ArchiveFormat::TarZstd)]
    #[case::gzip("a-1.tar.gz", "a-1", ArchiveFormat::TarGzip)]
    #[case::tgz("a-1.tgz", "a-1", ArchiveFormat::TarGzip)]
    fn split_name_recognises_suffixes(
        #[case] name: &str,
        #[case] stem: &str,
        #[case] format: ArchiveFormat,
    ) {
        assert_eq!(ArchiveFormat::split_name(name), Some((stem, format)));
    }

    #[rstest]
    #[case::zip("a-1.zip")]
    #[case::bare_suffix(".tar.xz")]
    #[case::plain_tar("a-1.tar")]
    fn split_name_rejects_unknown(#[case] name: &str) {
        assert_eq!(ArchiveFormat::split_name(name), None);
    }

    #[test]
    fn resolve_derives_paths_once() {
        let bundle = SourceBundle::resolve(
            &descriptor("yuzu-windows-msvc-source-20231102-4f1c2e3.tar.xz"),
            Utf8Path::new("/work"),
            Utf8Path::new("/work/src"),
        )
        .expect("bundle should resolve");

        assert_eq!(
            bundle.archive_path(),
            Utf8Path::new("/work/yuzu-windows-msvc-source-20231102-4f1c2e3.tar.xz")
        );
        assert_eq!(
            bundle.source_root(),
            Utf8Path::new("/work/src/yuzu-windows-msvc-source-20231102-4f1c2e3")
        );
        assert_eq!(bundle.format(), ArchiveFormat::TarXz);
        assert!(bundle.url().ends_with(bundle.name()));
    }

    #[rstest]
    #[case::nested("dir/a.tar.xz")]
    #[case::parent("../a.tar.xz")]
    #[case::absolute("/tmp/a.tar.xz")]
    #[case::backslash("..\\a.tar.xz")]
    #[case::dot(".")]
    fn resolve_rejects_path_like_names(#[case] name: &str) {
        let result = SourceBundle::resolve(
            &descriptor(name),
            Utf8Path::new("/work"),
            Utf8Path::new("/work/src"),
        );
        assert_eq!(result, Err(BundleError::NotAFileName));
    }

    #[test]
    fn resolve_rejects_unsupported_format() {
        let result = SourceBundle::resolve(
            &descriptor("a-1.zip"),
            Utf8Path::new("/work"),
            Utf8Path::new("/work/src"),
        );
        assert_eq!(result, Err(BundleError::UnsupportedFormat));
    }
}
