//! Credential loading for the release service.
//!
//! The credential file holds a single base64-encoded line which decodes to
//! `principal:secret`. Padding is optional, so tokens copied without their
//! trailing `=` characters still load.

use crate::error::{AgentError, Result};
use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use camino::Utf8Path;
use std::fmt;
use std::io::ErrorKind;

/// Standard-alphabet decoder that accepts input with or without padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A decoded service credential.
///
/// The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    principal: String,
    secret: String,
}

impl Credential {
    /// Create a credential from its decoded parts.
    #[must_use]
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            secret: secret.into(),
        }
    }

    /// The principal (user name) identifying the account.
    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// The secret presented alongside the principal.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Read and decode the credential stored at `path`.
///
/// # Errors
///
/// Returns [`AgentError::Configuration`] when the file does not exist, is
/// not UTF-8 text, or does not decode to `principal:secret`. Other read
/// failures surface as [`AgentError::Io`].
pub fn load_credential(path: &Utf8Path) -> Result<Credential> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(AgentError::configuration(format!(
                "credential file {path} not found; see README.md"
            )));
        }
        Err(err) => return Err(AgentError::Io(err)),
    };
    let contents = String::from_utf8(bytes).map_err(|_| {
        AgentError::configuration(format!("credential file {path} is not UTF-8 text"))
    })?;
    decode_credential(&contents)
}

/// Decode an encoded credential string into its parts.
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`AgentError::Configuration`] if the value is not valid base64,
/// does not decode to UTF-8, or does not split into exactly two
/// `:`-separated parts.
///
/// # Examples
///
/// ```
/// use relbuild_agent::credential::decode_credential;
///
/// // "carol:pa55word" without its trailing padding.
/// let credential = decode_credential("Y2Fyb2w6cGE1NXdvcmQ")?;
/// assert_eq!(credential.principal(), "carol");
/// assert_eq!(credential.secret(), "pa55word");
/// # Ok::<(), relbuild_agent::error::AgentError>(())
/// ```
pub fn decode_credential(encoded: &str) -> Result<Credential> {
    let bytes = LENIENT_BASE64
        .decode(encoded.trim())
        .map_err(|e| AgentError::configuration(format!("credential is not valid base64: {e}")))?;
    let decoded = String::from_utf8(bytes)
        .map_err(|_| AgentError::configuration("credential does not decode to UTF-8 text"))?;

    let mut parts = decoded.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(principal), Some(secret), None) if !principal.is_empty() => {
            Ok(Credential::new(principal, secret))
        }
        _ => Err(AgentError::configuration(
            "credential must decode to exactly `principal:secret`",
        )),
    }
}
