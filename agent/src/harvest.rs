//! Moving build outputs into the stable output directory.
//!
//! The output directory persists across runs; files with the same name are
//! replaced and anything else is left alone.

use crate::error::{AgentError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;

/// Binaries produced by the default build.
pub const DEFAULT_BINARIES: &[&str] = &["yuzu", "yuzu-cmd"];

/// Handles moving built binaries into the output directory.
#[derive(Debug, Clone)]
pub struct Harvester {
    output_dir: Utf8PathBuf,
    binaries: Vec<String>,
}

impl Harvester {
    /// Create a harvester for `binaries` targeting `output_dir`.
    #[must_use]
    pub fn new(output_dir: Utf8PathBuf, binaries: Vec<String>) -> Self {
        Self {
            output_dir,
            binaries,
        }
    }

    /// Ensure the output directory exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            AgentError::harvest(format!(
                "failed to create output directory {}: {e}",
                self.output_dir
            ))
        })
    }

    /// Move every configured binary out of `binary_dir`.
    ///
    /// All binaries are checked before any is moved, so a missing binary
    /// leaves both directories untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Harvest`] naming the missing binaries, or if a
    /// move fails.
    pub fn harvest(&self, binary_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
        let missing: Vec<&str> = self
            .binaries
            .iter()
            .map(String::as_str)
            .filter(|name| !binary_dir.join(name).is_file())
            .collect();
        if !missing.is_empty() {
            return Err(AgentError::harvest(format!(
                "expected build outputs missing from {binary_dir}: {}",
                missing.join(", ")
            )));
        }

        self.binaries
            .iter()
            .map(|name| -> Result<Utf8PathBuf> {
                let dest = self.output_dir.join(name);
                move_file(&binary_dir.join(name), &dest)?;
                Ok(dest)
            })
            .collect()
    }

    /// Return the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }
}

/// Rename `src` onto `dest`, falling back to copy and remove when a rename
/// is not possible (for example across filesystems).
fn move_file(src: &Utf8Path, dest: &Utf8Path) -> Result<()> {
    if fs::rename(src, dest).is_ok() {
        debug!("moved {src} to {dest}");
        return Ok(());
    }

    fs::copy(src, dest)
        .map_err(|e| AgentError::harvest(format!("failed to copy {src} to {dest}: {e}")))?;
    fs::remove_file(src)
        .map_err(|e| AgentError::harvest(format!("failed to remove {src} after copy: {e}")))?;
    debug!("copied {src} to {dest}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    struct Layout {
        _temp: tempfile::TempDir,
        binary_dir: Utf8PathBuf,
        output_dir: Utf8PathBuf,
    }

    #[fixture]
    fn layout() -> Layout {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        let binary_dir = root.join("src/pkg/build/bin");
        fs::create_dir_all(&binary_dir).expect("binary dir");
        Layout {
            _temp: temp,
            binary_dir,
            output_dir: root.join("build"),
        }
    }

    fn default_harvester(output_dir: &Utf8Path) -> Harvester {
        Harvester::new(
            output_dir.to_owned(),
            DEFAULT_BINARIES.iter().map(|b| (*b).to_owned()).collect(),
        )
    }

    #[rstest]
    fn moves_all_binaries_and_overwrites(layout: Layout) {
        fs::create_dir_all(&layout.output_dir).expect("output dir");
        fs::write(layout.output_dir.join("yuzu"), b"old").expect("old binary");
        fs::write(layout.output_dir.join("notes.txt"), b"keep").expect("unrelated file");
        for name in DEFAULT_BINARIES {
            fs::write(layout.binary_dir.join(name), b"new").expect("binary");
        }

        let harvester = default_harvester(&layout.output_dir);
        harvester.prepare().expect("prepare");
        let moved = harvester.harvest(&layout.binary_dir).expect("harvest");

        assert_eq!(moved.len(), 2);
        assert_eq!(
            fs::read(layout.output_dir.join("yuzu")).expect("read"),
            b"new"
        );
        assert!(layout.output_dir.join("notes.txt").exists());
        assert!(!layout.binary_dir.join("yuzu-cmd").exists());
    }

    #[rstest]
    #[case::first_missing("yuzu")]
    #[case::second_missing("yuzu-cmd")]
    fn missing_binary_moves_nothing(layout: Layout, #[case] missing: &str) {
        for name in DEFAULT_BINARIES.iter().filter(|n| **n != missing) {
            fs::write(layout.binary_dir.join(name), b"bin").expect("binary");
        }

        let harvester = default_harvester(&layout.output_dir);
        harvester.prepare().expect("prepare");
        let err = harvester
            .harvest(&layout.binary_dir)
            .expect_err("harvest should fail");

        match err {
            AgentError::Harvest { reason } => assert!(reason.contains(missing)),
            other => panic!("expected Harvest, got {other:?}"),
        }
        let leftover = fs::read_dir(&layout.output_dir).expect("read output").count();
        assert_eq!(leftover, 0, "nothing may be moved when a binary is missing");
    }

    #[rstest]
    fn prepare_creates_output_dir(layout: Layout) {
        let harvester = default_harvester(&layout.output_dir);
        harvester.prepare().expect("prepare");
        assert!(harvester.output_dir().is_dir());
    }
}
