//! Shared test utilities for the agent crate.

use crate::bundle::ArchiveFormat;
use crate::config::BuildConfig;
use crate::credential::Credential;
use crate::release::{ArtifactDescriptor, AuthToken, ReleaseCatalog, ReleaseService, RequestError};
use base64::Engine as _;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::ExitStatus;

/// A catalog file name matching the default artifact pattern.
pub const SOURCE_BUNDLE_NAME: &str = "yuzu-windows-msvc-source-20231102-4f1c2e3.tar.xz";

/// The directory [`SOURCE_BUNDLE_NAME`] extracts to.
pub const SOURCE_ROOT_NAME: &str = "yuzu-windows-msvc-source-20231102-4f1c2e3";

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Encode `principal:secret` the way the credential file stores it.
pub fn encode_credential(principal: &str, secret: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(format!("{principal}:{secret}"))
}

/// Build a compressed tar archive holding `entries` as regular files.
///
/// # Panics
///
/// Panics if the archive cannot be assembled in memory.
pub fn tar_archive_bytes(format: ArchiveFormat, entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, *data)
            .expect("append tar entry");
    }
    let tar = builder.into_inner().expect("finish tar");

    match format {
        ArchiveFormat::TarXz => {
            let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
            encoder.write_all(&tar).expect("xz encode");
            encoder.finish().expect("xz finish")
        }
        ArchiveFormat::TarZstd => zstd::encode_all(tar.as_slice(), 0).expect("zstd encode"),
        ArchiveFormat::TarGzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&tar).expect("gzip encode");
            encoder.finish().expect("gzip finish")
        }
    }
}

/// Write a compressed tar archive holding `entries` to `path`.
///
/// # Panics
///
/// Panics if the archive cannot be built or written.
pub fn write_tar_archive(path: &Path, format: ArchiveFormat, entries: &[(&str, &[u8])]) {
    std::fs::write(path, tar_archive_bytes(format, entries)).expect("write archive");
}

/// An `.tar.xz` bundle for [`SOURCE_BUNDLE_NAME`] containing a minimal tree.
pub fn source_bundle_bytes() -> Vec<u8> {
    let cmake = format!("{SOURCE_ROOT_NAME}/CMakeLists.txt");
    tar_archive_bytes(
        ArchiveFormat::TarXz,
        &[(cmake.as_str(), b"project(yuzu)\n".as_slice())],
    )
}

/// Render a catalog response body.
pub fn catalog_json(version: u64, files: &[(&str, &str)]) -> String {
    let files: Vec<_> = files
        .iter()
        .map(|(name, url)| serde_json::json!({ "name": name, "url": url }))
        .collect();
    serde_json::json!({ "version": version, "files": files }).to_string()
}

/// Shell script for a compile step that writes each of `binaries` into
/// `bin/` under the build directory.
pub fn compile_script_producing(binaries: &[&str]) -> String {
    let mut script = "mkdir -p bin".to_owned();
    for binary in binaries {
        script.push_str(&format!(" && echo built > bin/{binary}"));
    }
    script
}

/// Build configuration driving `sh` instead of a real toolchain.
///
/// Configure always succeeds; compile runs `compile_script` in the build
/// directory.
pub fn mock_build_config(compile_script: &str) -> BuildConfig {
    BuildConfig {
        configure: vec![
            "sh".to_owned(),
            "-c".to_owned(),
            "echo configuring".to_owned(),
        ],
        compile: vec!["sh".to_owned(), "-c".to_owned(), compile_script.to_owned()],
        ..BuildConfig::default()
    }
}

/// A request observed by [`StubReleaseService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    /// Token exchange as `principal`.
    Authenticate {
        /// The principal presented.
        principal: String,
    },
    /// Catalog fetch.
    FetchCatalog,
    /// Artifact download.
    Download {
        /// The requested URL.
        url: String,
        /// The bearer token presented.
        token: String,
    },
}

/// A scripted `ReleaseService` that records every call.
#[derive(Debug)]
pub struct StubReleaseService {
    auth: Result<String, u16>,
    catalog: Result<ReleaseCatalog, u16>,
    downloads: HashMap<String, Vec<u8>>,
    calls: RefCell<Vec<ServiceCall>>,
}

impl StubReleaseService {
    /// A service that accepts any credential and serves `catalog`.
    pub fn new(catalog: ReleaseCatalog) -> Self {
        Self {
            auth: Ok("stub-token".to_owned()),
            catalog: Ok(catalog),
            downloads: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// A service publishing [`SOURCE_BUNDLE_NAME`] at `version`, serving
    /// [`source_bundle_bytes`] for it.
    pub fn publishing(version: u64) -> Self {
        let url = format!("https://downloads.example.test/{SOURCE_BUNDLE_NAME}");
        let catalog = ReleaseCatalog {
            version,
            files: vec![ArtifactDescriptor {
                name: SOURCE_BUNDLE_NAME.to_owned(),
                url: url.clone(),
            }],
        };
        Self::new(catalog).with_download(&url, source_bundle_bytes())
    }

    /// Reject authentication with `status`.
    #[must_use]
    pub fn rejecting_auth(mut self, status: u16) -> Self {
        self.auth = Err(status);
        self
    }

    /// Fail catalog fetches with `status`.
    #[must_use]
    pub fn failing_catalog(mut self, status: u16) -> Self {
        self.catalog = Err(status);
        self
    }

    /// Serve `bytes` for downloads of `url`; other URLs answer 404.
    #[must_use]
    pub fn with_download(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.downloads.insert(url.to_owned(), bytes);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.borrow().clone()
    }

    /// Whether any download was attempted.
    pub fn downloaded(&self) -> bool {
        self.calls
            .borrow()
            .iter()
            .any(|call| matches!(call, ServiceCall::Download { .. }))
    }

    fn record(&self, call: ServiceCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl ReleaseService for StubReleaseService {
    fn authenticate(&self, credential: &Credential) -> Result<AuthToken, RequestError> {
        self.record(ServiceCall::Authenticate {
            principal: credential.principal().to_owned(),
        });
        match &self.auth {
            Ok(token) => Ok(AuthToken::new(token.clone())),
            Err(status) => Err(RequestError::Status {
                url: "stub://auth".to_owned(),
                status: *status,
            }),
        }
    }

    fn fetch_catalog(&self) -> Result<ReleaseCatalog, RequestError> {
        self.record(ServiceCall::FetchCatalog);
        match &self.catalog {
            Ok(catalog) => Ok(catalog.clone()),
            Err(status) => Err(RequestError::Status {
                url: "stub://catalog".to_owned(),
                status: *status,
            }),
        }
    }

    fn download_artifact(
        &self,
        url: &str,
        token: &AuthToken,
        dest: &Path,
    ) -> Result<(), RequestError> {
        self.record(ServiceCall::Download {
            url: url.to_owned(),
            token: token.as_str().to_owned(),
        });
        let bytes = self.downloads.get(url).ok_or_else(|| RequestError::Status {
            url: url.to_owned(),
            status: 404,
        })?;
        std::fs::write(dest, bytes)?;
        Ok(())
    }
}
