use std::fmt;

/// The raw session token presented by a client.
///
/// Debug and Display output is always `[REDACTED]`, so a credential can be
/// carried through log statements without leaking it. The token is only
/// reachable through [`expose_token`](Self::expose_token).
///
/// # Examples
///
/// ```
/// use broker_gate::SessionCredential;
///
/// let credential = SessionCredential::new("eyJhbGciOi...");
/// assert_eq!(format!("{credential:?}"), "[REDACTED]");
/// assert_eq!(credential.expose_token(), "eyJhbGciOi...");
/// ```
// Do NOT derive Clone or Debug: both would make the token easy to copy into logs.
pub struct SessionCredential {
    token: String,
}

impl SessionCredential {
    /// Wraps a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Returns the raw token for validation.
    pub fn expose_token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
