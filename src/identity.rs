//! Identity resolution boundary.
//!
//! Resolving a request to a user is owned by an external collaborator. The
//! gate only needs its answer as a three-way [`IdentityResult`], which keeps
//! "no credential" and "bad credential" structurally apart.

use std::error::Error as StdError;

use http::request::Parts;
use thiserror::Error;

use crate::config::BrokerConfig;
use crate::cookie::parse_request_cookies;
use crate::credential::SessionCredential;
use crate::error::Result;

/// Outcome of resolving the identity behind a request.
#[derive(Debug)]
pub enum IdentityResult {
    /// A valid credential was presented for `user`.
    Authenticated {
        /// The resolved user name
        user: String,
    },
    /// No credential was presented.
    Unauthenticated,
    /// A credential was presented but failed validation.
    Invalid {
        /// Why validation failed
        cause: CredentialError,
    },
}

impl IdentityResult {
    /// Shorthand for [`IdentityResult::Authenticated`].
    pub fn authenticated(user: impl Into<String>) -> Self {
        IdentityResult::Authenticated { user: user.into() }
    }

    /// Shorthand for [`IdentityResult::Invalid`] with a plain message.
    pub fn invalid(message: impl Into<String>) -> Self {
        IdentityResult::Invalid {
            cause: CredentialError::new(message),
        }
    }

    /// The user name, if authenticated.
    pub fn user(&self) -> Option<&str> {
        match self {
            IdentityResult::Authenticated { user } => Some(user),
            _ => None,
        }
    }
}

/// Reason a presented credential was rejected (tampering or corruption).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CredentialError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CredentialError {
    /// Creates an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping the validator's own error.
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The human-readable cause.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Turns a request into an identity.
///
/// Implementations see the request head only and must not mutate it.
///
/// # Examples
///
/// ```
/// use broker_gate::{IdentityResolver, IdentityResult};
/// use http::request::Parts;
///
/// let anonymous = |_: &Parts| IdentityResult::Unauthenticated;
///
/// let (parts, ()) = http::Request::new(()).into_parts();
/// assert!(anonymous.resolve(&parts).user().is_none());
/// ```
pub trait IdentityResolver {
    /// Resolves the identity behind `request`.
    fn resolve(&self, request: &Parts) -> IdentityResult;
}

impl<F> IdentityResolver for F
where
    F: Fn(&Parts) -> IdentityResult,
{
    fn resolve(&self, request: &Parts) -> IdentityResult {
        self(request)
    }
}

/// Validates a session token and names the user it was issued to.
///
/// Token format and cryptography live behind this trait.
pub trait TokenValidator {
    /// Returns the user for a valid token, or why the token is invalid.
    fn validate(&self, credential: &SessionCredential) -> std::result::Result<String, CredentialError>;
}

impl<F> TokenValidator for F
where
    F: Fn(&SessionCredential) -> std::result::Result<String, CredentialError>,
{
    fn validate(&self, credential: &SessionCredential) -> std::result::Result<String, CredentialError> {
        self(credential)
    }
}

/// Resolves identity from the broker's session credential cookie.
///
/// A missing or empty cookie is [`IdentityResult::Unauthenticated`]; any
/// cookie that is present goes through the [`TokenValidator`].
#[derive(Debug, Clone)]
pub struct CookieIdentityResolver<V> {
    session_cookie: String,
    validator: V,
}

impl<V: TokenValidator> CookieIdentityResolver<V> {
    /// Creates a resolver reading the session cookie named by `config`.
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not validate.
    pub fn new(config: &BrokerConfig, validator: V) -> Result<Self> {
        let names = config.validate()?;
        Ok(Self {
            session_cookie: names.session_cookie().to_string(),
            validator,
        })
    }
}

impl<V: TokenValidator> IdentityResolver for CookieIdentityResolver<V> {
    fn resolve(&self, request: &Parts) -> IdentityResult {
        let token = parse_request_cookies(&request.headers)
            .into_iter()
            .find(|c| c.name == self.session_cookie)
            .map(|c| c.unquoted_value().to_string());

        match token {
            None => IdentityResult::Unauthenticated,
            Some(token) if token.is_empty() => IdentityResult::Unauthenticated,
            Some(token) => match self.validator.validate(&SessionCredential::new(token)) {
                Ok(user) => IdentityResult::Authenticated { user },
                Err(cause) => IdentityResult::Invalid { cause },
            },
        }
    }
}
