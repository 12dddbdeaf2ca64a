//! HTTP access to the release service.
//!
//! Provides a trait-based abstraction over the three requests a run makes
//! (token exchange, catalog listing, and bundle download) so that the
//! pipeline can be exercised without network access.

use crate::credential::Credential;
use crate::release::catalog::ReleaseCatalog;
use crate::release::token::AuthToken;
use log::debug;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default token-exchange endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://api.yuzu-emu.org/jwt/installer/";

/// Default catalog endpoint.
pub const DEFAULT_CATALOG_URL: &str = "https://api.yuzu-emu.org/downloads/earlyaccess/";

/// Default `User-Agent`; the upstream service rejects requests without it.
pub const DEFAULT_USER_AGENT: &str = "liftinstall (j-selby)";

/// Trait for talking to the release service.
///
/// Abstractions allow tests to script service behaviour without network
/// access.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseService {
    /// Exchange `credential` for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport failure or non-success status.
    fn authenticate(&self, credential: &Credential) -> Result<AuthToken, RequestError>;

    /// Fetch the current release catalog.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport failure, non-success status, or
    /// malformed response body.
    fn fetch_catalog(&self) -> Result<ReleaseCatalog, RequestError>;

    /// Download the artifact at `url` into `dest`, authorising with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport failure, non-success status, or
    /// failure writing `dest`.
    fn download_artifact(&self, url: &str, token: &AuthToken, dest: &Path)
    -> Result<(), RequestError>;
}

/// Errors arising from release service requests.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The service answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The request could not be completed.
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The response body could not be interpreted.
    #[error("unexpected response from {url}: {reason}")]
    Malformed {
        /// The URL that was requested.
        url: String,
        /// Why the body was rejected.
        reason: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

impl RequestError {
    /// The HTTP status code, when the service answered with one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Endpoint and header settings for [`HttpReleaseService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    /// Token-exchange endpoint (`POST`).
    pub auth_url: String,
    /// Catalog endpoint (`GET`).
    pub catalog_url: String,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Header carrying the credential principal.
    pub principal_header: String,
    /// Header carrying the credential secret.
    pub secret_header: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_owned(),
            catalog_url: DEFAULT_CATALOG_URL.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            principal_header: "X-Username".to_owned(),
            secret_header: "X-Token".to_owned(),
        }
    }
}

/// HTTP-based release service client using `ureq`.
///
/// Requests carry no timeout: a run blocks for as long as the service takes.
pub struct HttpReleaseService {
    endpoints: ServiceEndpoints,
    agent: ureq::Agent,
}

impl HttpReleaseService {
    /// Create a client for the given endpoints.
    #[must_use]
    pub fn new(endpoints: ServiceEndpoints) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(true)
            .build();
        Self {
            endpoints,
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// The endpoints this client talks to.
    #[must_use]
    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }
}

impl ReleaseService for HttpReleaseService {
    fn authenticate(&self, credential: &Credential) -> Result<AuthToken, RequestError> {
        let url = &self.endpoints.auth_url;
        debug!("requesting token from {url} as {}", credential.principal());
        let response = self
            .agent
            .post(url)
            .header("User-Agent", &self.endpoints.user_agent)
            .header(&self.endpoints.principal_header, credential.principal())
            .header(&self.endpoints.secret_header, credential.secret())
            .send_empty()
            .map_err(|e| map_ureq_error(url, &e))?;
        let body = read_body(url, response)?;
        Ok(AuthToken::new(body))
    }

    fn fetch_catalog(&self) -> Result<ReleaseCatalog, RequestError> {
        let url = &self.endpoints.catalog_url;
        debug!("fetching release catalog from {url}");
        let response = self
            .agent
            .get(url)
            .header("User-Agent", &self.endpoints.user_agent)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let body = read_body(url, response)?;
        ReleaseCatalog::from_json(&body).map_err(|e| RequestError::Malformed {
            url: url.clone(),
            reason: e.to_string(),
        })
    }

    fn download_artifact(
        &self,
        url: &str,
        token: &AuthToken,
        dest: &Path,
    ) -> Result<(), RequestError> {
        debug!("downloading {url} to {}", dest.display());
        let response = self
            .agent
            .get(url)
            .header("User-Agent", &self.endpoints.user_agent)
            .header("Authorization", &token.bearer_header())
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;

        let bytes = write_download(&mut response.into_body().as_reader(), dest)?;
        debug!("wrote {bytes} bytes to {}", dest.display());
        Ok(())
    }
}

/// Stream `body` into a new file at `dest`.
///
/// A body that fails part-way leaves no file behind.
fn write_download(body: &mut dyn Read, dest: &Path) -> Result<u64, RequestError> {
    let mut file = File::create(dest)?;
    match std::io::copy(body, &mut file) {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            drop(file);
            if std::fs::remove_file(dest).is_err() {
                // Best-effort cleanup; the original error is more useful.
            }
            Err(RequestError::Io(err))
        }
    }
}

/// Read a response body as text.
fn read_body(
    url: &str,
    response: ureq::http::Response<ureq::Body>,
) -> Result<String, RequestError> {
    response
        .into_body()
        .read_to_string()
        .map_err(|e| RequestError::Transport {
            url: url.to_owned(),
            reason: e.to_string(),
        })
}

/// Map a ureq error to a [`RequestError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> RequestError {
    match err {
        ureq::Error::StatusCode(status) => RequestError::Status {
            url: url.to_owned(),
            status: *status,
        },
        other => RequestError::Transport {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
