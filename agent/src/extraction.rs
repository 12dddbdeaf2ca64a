//! Source bundle extraction.
//!
//! Unpacks compressed tar archives into a freshly cleared working tree, with
//! path traversal protection to prevent zip-slip attacks. A previous run's
//! tree is always removed first so that extraction never merges into stale
//! sources.

use crate::bundle::{ArchiveFormat, SourceBundle};
use crate::error::{AgentError, Result};
use camino::Utf8Path;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path};

/// Trait for extracting bundle archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use relbuild_agent::extraction::TarExtractor;
///
/// let extractor = TarExtractor;
/// // Use extractor.extract(archive_path, format, dest_dir) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait Extractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the list of entry paths that were extracted.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry attempts to
    /// escape the destination directory, [`ExtractionError::EmptyArchive`]
    /// if the archive has no entries, and [`ExtractionError::Io`] on
    /// decompression or I/O failures.
    fn extract(
        &self,
        archive_path: &Path,
        format: ArchiveFormat,
        dest_dir: &Path,
    ) -> std::result::Result<Vec<String>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O or decompression error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no entries.
    #[error("archive contains no files")]
    EmptyArchive,

    /// The archive did not produce the expected top-level source directory.
    #[error("archive did not contain the expected source root {expected}")]
    MissingSourceRoot {
        /// The directory the archive was expected to create.
        expected: String,
    },
}

/// Default extractor using the `tar` crate over `xz2`, `zstd`, or `flate2`
/// decoders.
///
/// Validates each entry path before extraction to guard against path
/// traversal attacks (zip-slip).
pub struct TarExtractor;

impl Extractor for TarExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        format: ArchiveFormat,
        dest_dir: &Path,
    ) -> std::result::Result<Vec<String>, ExtractionError> {
        let file = BufReader::new(File::open(archive_path)?);
        let decoder = decoder_for(format, file)?;
        let mut archive = tar::Archive::new(decoder);
        let mut extracted = Vec::new();

        for entry_result in archive.entries()? {
            let mut entry = entry_result?;
            let entry_path = entry.path()?.into_owned();

            validate_entry_path(&entry_path)?;

            let dest_path = dest_dir.join(&entry_path);
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            entry.unpack(&dest_path)?;
            extracted.push(entry_path.display().to_string());
        }

        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }

        Ok(extracted)
    }
}

/// Wrap `reader` in the decompressor matching `format`.
fn decoder_for<'a, R: Read + 'a>(
    format: ArchiveFormat,
    reader: BufReader<R>,
) -> std::io::Result<Box<dyn Read + 'a>> {
    Ok(match format {
        ArchiveFormat::TarXz => Box::new(xz2::bufread::XzDecoder::new(reader)),
        ArchiveFormat::TarZstd => Box::new(zstd::Decoder::with_buffer(reader)?),
        ArchiveFormat::TarGzip => Box::new(flate2::bufread::GzDecoder::new(reader)),
    })
}

/// Validate that a tar entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> std::result::Result<(), ExtractionError> {
    if path.is_absolute() || path.has_root() {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    for component in path.components() {
        if matches!(component, Component::ParentDir | Component::Prefix(_)) {
            return Err(ExtractionError::PathTraversal {
                path: path.display().to_string(),
            });
        }
    }
    Ok(())
}

/// Remove a working tree left by a previous run, if any.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be removed.
pub fn clear_working_tree(source_dir: &Utf8Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(source_dir) {
        Ok(()) => {
            debug!("removed stale working tree {source_dir}");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Unpack `bundle` into a clean `source_dir`, then delete the archive.
///
/// Any existing `source_dir` is destroyed before extraction begins. On
/// failure the partially extracted tree is left as it is.
///
/// # Errors
///
/// Returns [`AgentError::Extraction`] if the stale tree cannot be removed,
/// the archive cannot be unpacked, the expected source root is missing
/// afterwards, or the archive cannot be deleted.
pub fn unpack_bundle(
    extractor: &dyn Extractor,
    bundle: &SourceBundle,
    source_dir: &Utf8Path,
) -> Result<usize> {
    let archive = bundle.archive_path();
    let wrap = |source: ExtractionError| AgentError::Extraction {
        archive: archive.to_owned(),
        source,
    };

    clear_working_tree(source_dir).map_err(|e| wrap(e.into()))?;
    std::fs::create_dir_all(source_dir).map_err(|e| wrap(e.into()))?;

    let entries = extractor
        .extract(
            archive.as_std_path(),
            bundle.format(),
            source_dir.as_std_path(),
        )
        .map_err(wrap)?;

    if !bundle.source_root().is_dir() {
        return Err(wrap(ExtractionError::MissingSourceRoot {
            expected: bundle.source_root().to_string(),
        }));
    }

    std::fs::remove_file(archive).map_err(|e| wrap(e.into()))?;
    info!(
        "extracted {} entries from {} into {source_dir}",
        entries.len(),
        bundle.name()
    );
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ArtifactDescriptor;
    use crate::test_utils::write_tar_archive;
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use std::path::PathBuf;

    fn utf8_temp() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        (temp, path)
    }

    fn bundle_in(root: &Utf8Path, name: &str) -> SourceBundle {
        let descriptor = ArtifactDescriptor {
            name: name.to_owned(),
            url: format!("https://example.test/{name}"),
        };
        SourceBundle::resolve(&descriptor, root, &root.join("src")).expect("bundle")
    }

    #[rstest]
    #[case::xz("pkg-1.tar.xz", ArchiveFormat::TarXz)]
    #[case::zstd("pkg-1.tar.zst", ArchiveFormat::TarZstd)]
    #[case::gzip("pkg-1.tar.gz", ArchiveFormat::TarGzip)]
    fn extracts_each_supported_format(#[case] name: &str, #[case] format: ArchiveFormat) {
        let (_temp, root) = utf8_temp();
        let archive_path = root.join(name);
        write_tar_archive(
            archive_path.as_std_path(),
            format,
            &[("pkg-1/CMakeLists.txt", b"project(pkg)".as_slice())],
        );
        let dest_dir = root.join("out");
        std::fs::create_dir_all(&dest_dir).expect("create dest");

        let files = TarExtractor
            .extract(archive_path.as_std_path(), format, dest_dir.as_std_path())
            .expect("extract");
        assert_eq!(files, vec!["pkg-1/CMakeLists.txt"]);
        assert!(dest_dir.join("pkg-1/CMakeLists.txt").exists());
    }

    #[rstest]
    #[case::parent_dir("../escape.txt")]
    #[case::nested_parent("foo/../../escape.txt")]
    fn rejects_path_traversal(#[case] bad_path: &str) {
        let path = PathBuf::from(bad_path);
        let result = validate_entry_path(&path);
        assert!(
            matches!(result, Err(ExtractionError::PathTraversal { .. })),
            "expected PathTraversal for {bad_path}"
        );
    }

    #[test]
    fn accepts_normal_paths() {
        let path = PathBuf::from("pkg-1/src/main.cpp");
        assert!(validate_entry_path(&path).is_ok());
    }

    #[test]
    fn rejects_absolute_path() {
        let path = PathBuf::from("/etc/passwd");
        let result = validate_entry_path(&path);
        assert!(matches!(result, Err(ExtractionError::PathTraversal { .. })));
    }

    #[test]
    fn extract_empty_archive() {
        let (_temp, root) = utf8_temp();
        let archive_path = root.join("empty.tar.xz");
        write_tar_archive(archive_path.as_std_path(), ArchiveFormat::TarXz, &[]);
        let dest_dir = root.join("out");
        std::fs::create_dir_all(&dest_dir).expect("create dest");

        let result = TarExtractor.extract(
            archive_path.as_std_path(),
            ArchiveFormat::TarXz,
            dest_dir.as_std_path(),
        );
        assert!(matches!(result, Err(ExtractionError::EmptyArchive)));
    }

    #[test]
    fn corrupt_archive_is_an_io_error() {
        let (_temp, root) = utf8_temp();
        let archive_path = root.join("broken.tar.xz");
        std::fs::write(&archive_path, b"definitely not xz").expect("write");

        let result = TarExtractor.extract(
            archive_path.as_std_path(),
            ArchiveFormat::TarXz,
            root.as_std_path(),
        );
        assert!(matches!(result, Err(ExtractionError::Io(_))));
    }

    #[test]
    fn unpack_replaces_stale_tree_and_removes_archive() {
        let (_temp, root) = utf8_temp();
        let bundle = bundle_in(&root, "pkg-2.tar.xz");
        let stale = root.join("src/pkg-1/stale.txt");
        std::fs::create_dir_all(stale.parent().expect("parent")).expect("stale dir");
        std::fs::write(&stale, b"old").expect("stale file");
        write_tar_archive(
            bundle.archive_path().as_std_path(),
            ArchiveFormat::TarXz,
            &[("pkg-2/README", b"new".as_slice())],
        );

        let count = unpack_bundle(&TarExtractor, &bundle, &root.join("src")).expect("unpack");

        assert_eq!(count, 1);
        assert!(!stale.exists(), "stale tree should be removed");
        assert!(bundle.source_root().join("README").exists());
        assert!(!bundle.archive_path().exists(), "archive should be deleted");
    }

    #[test]
    fn unpack_requires_expected_source_root() {
        let (_temp, root) = utf8_temp();
        let bundle = bundle_in(&root, "pkg-3.tar.gz");
        write_tar_archive(
            bundle.archive_path().as_std_path(),
            ArchiveFormat::TarGzip,
            &[("other-dir/README", b"x".as_slice())],
        );

        let err = unpack_bundle(&TarExtractor, &bundle, &root.join("src"))
            .expect_err("missing source root should fail");
        assert!(matches!(
            err,
            AgentError::Extraction {
                source: ExtractionError::MissingSourceRoot { .. },
                ..
            }
        ));
        assert!(
            bundle.archive_path().exists(),
            "archive is only removed after a successful extraction"
        );
    }

    #[test]
    fn unpack_surfaces_extractor_failure() {
        let (_temp, root) = utf8_temp();
        let bundle = bundle_in(&root, "pkg-4.tar.xz");
        let mut extractor = MockExtractor::new();
        extractor
            .expect_extract()
            .returning(|_, _, _| Err(ExtractionError::EmptyArchive));

        let err = unpack_bundle(&extractor, &bundle, &root.join("src"))
            .expect_err("extractor failure should propagate");
        assert!(matches!(
            err,
            AgentError::Extraction {
                source: ExtractionError::EmptyArchive,
                ..
            }
        ));
    }
}
