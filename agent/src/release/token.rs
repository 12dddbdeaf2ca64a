//! Bearer token returned by the authentication endpoint.

use std::fmt;

/// An opaque, short-lived authorization token.
///
/// The token is kept exactly as the service returned it and is only ever
/// rendered into an `Authorization` header. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a token returned by the service.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The token exactly as returned by the service.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the `Authorization` header value for this token.
    ///
    /// Surrounding whitespace, such as a trailing newline in the response
    /// body, is not valid inside a header value and is stripped here.
    ///
    /// # Examples
    ///
    /// ```
    /// use relbuild_agent::release::AuthToken;
    ///
    /// let token = AuthToken::new("abc.def.ghi\n");
    /// assert_eq!(token.bearer_header(), "Bearer abc.def.ghi");
    /// ```
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0.trim())
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}
