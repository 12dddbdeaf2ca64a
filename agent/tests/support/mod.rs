//! Test support utilities for agent integration and behavioural tests.
//!
//! This module provides a scratch agent workspace with a provisioned
//! credential, plus helpers for building settings that drive `sh` as a stand-in
//! toolchain.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use camino::{Utf8Path, Utf8PathBuf};
use relbuild_agent::config::{AgentConfig, RunSettings};
use relbuild_agent::harvest::DEFAULT_BINARIES;
use relbuild_agent::test_utils::{compile_script_producing, encode_credential, mock_build_config};
use tempfile::TempDir;

/// A temporary base directory laid out the way the agent expects.
pub struct AgentWorkspace {
    _temp: TempDir,
    base: Utf8PathBuf,
}

impl AgentWorkspace {
    /// Creates a workspace with a `TOKEN` file for `carol:pa55word`.
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("create temp dir");
        let base = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("temp dir not UTF-8");
        std::fs::write(base.join("TOKEN"), encode_credential("carol", "pa55word"))
            .expect("write TOKEN");
        Self { _temp: temp, base }
    }

    /// The base directory.
    pub fn base(&self) -> &Utf8Path {
        &self.base
    }

    /// Resolves `config` against this workspace.
    pub fn settings(&self, config: &AgentConfig) -> RunSettings {
        config.settings(&self.base).expect("valid settings")
    }

    /// Seeds the version marker.
    pub fn write_marker(&self, contents: &str) {
        std::fs::write(self.base.join("last_downloaded_ver.txt"), contents)
            .expect("write marker");
    }

    /// Current marker contents, if the file exists.
    pub fn marker(&self) -> Option<String> {
        std::fs::read_to_string(self.base.join("last_downloaded_ver.txt")).ok()
    }

    /// The default output directory.
    pub fn output_dir(&self) -> Utf8PathBuf {
        self.base.join("build")
    }

    /// The default working tree.
    pub fn source_dir(&self) -> Utf8PathBuf {
        self.base.join("src")
    }

    /// Names of the files currently in the output directory.
    pub fn harvested(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.output_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|entry| {
                entry
                    .expect("read output entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }
}

/// Configuration whose toolchain produces every default binary.
pub fn producing_all_binaries() -> AgentConfig {
    with_compile_script(&compile_script_producing(DEFAULT_BINARIES))
}

/// Configuration whose compile step runs `script` under `sh -c`.
pub fn with_compile_script(script: &str) -> AgentConfig {
    AgentConfig {
        build: mock_build_config(script),
        ..AgentConfig::default()
    }
}
