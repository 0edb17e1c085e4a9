//! Process-wide broker configuration.
//!
//! The configuration is read once before request handling starts and is
//! shared read-only (behind an `Arc`) by every request afterwards.

use http::HeaderName;
use serde::Deserialize;
use url::Url;

use crate::cookie::{is_token, ReservedPrefix};
use crate::error::{Error, Result};

/// Default prefix reserved for broker-owned cookie and header names.
pub const DEFAULT_RESERVED_PREFIX: &str = "X-Broker";

/// Configuration of the access broker.
///
/// # Examples
///
/// ```
/// use broker_gate::BrokerConfig;
///
/// let config = BrokerConfig::new(
///     "auth.example.com",
///     "example.com",
///     "https://auth.example.com/login",
/// );
/// assert!(config.validate().is_ok());
/// assert_eq!(config.reserved_prefix, "X-Broker");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrokerConfig {
    /// Canonical authentication/login host (the primary domain).
    pub hostname: String,
    /// `Domain` attribute applied to broker cookies.
    pub cookie_scope: String,
    /// Login entry point that unauthenticated users are redirected to.
    #[serde(alias = "fqdn")]
    pub login_url: String,
    /// Prefix shared by every broker-owned cookie and header name.
    #[serde(default = "default_reserved_prefix")]
    pub reserved_prefix: String,
}

fn default_reserved_prefix() -> String {
    DEFAULT_RESERVED_PREFIX.to_string()
}

impl BrokerConfig {
    /// Creates a configuration with the default reserved prefix.
    pub fn new(
        hostname: impl Into<String>,
        cookie_scope: impl Into<String>,
        login_url: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            cookie_scope: cookie_scope.into(),
            login_url: login_url.into(),
            reserved_prefix: default_reserved_prefix(),
        }
    }

    /// Replaces the reserved prefix.
    pub fn with_reserved_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefix = prefix.into();
        self
    }

    /// Checks the configuration and derives the broker's names from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the hostname is empty, the cookie scope
    /// is not usable as a cookie `Domain`, the login URL is not an absolute
    /// http(s) URL, or the reserved prefix is not a valid token.
    pub fn validate(&self) -> Result<BrokerNames> {
        if self.hostname.trim().is_empty() {
            return Err(Error::config("hostname must not be empty"));
        }

        if !self
            .cookie_scope
            .chars()
            .all(|c| c.is_ascii_graphic() && c != ';' && c != ',')
        {
            return Err(Error::config(format!(
                "cookie scope '{}' is not a valid cookie domain",
                self.cookie_scope
            )));
        }

        let login = Url::parse(&self.login_url).map_err(|e| {
            Error::config(format!("login url '{}' is invalid: {e}", self.login_url))
        })?;
        if !matches!(login.scheme(), "http" | "https") || !login.has_host() {
            return Err(Error::config(format!(
                "login url '{}' must be an absolute http(s) url",
                self.login_url
            )));
        }

        if !is_token(&self.reserved_prefix) {
            return Err(Error::config(format!(
                "reserved prefix '{}' is not a valid token",
                self.reserved_prefix
            )));
        }

        BrokerNames::derive(&self.reserved_prefix)
    }

    /// Returns true when `host` is the primary authentication domain.
    pub fn is_primary_host(&self, host: &str) -> bool {
        host == self.hostname
    }
}

/// Cookie and header names owned by the broker.
///
/// Every name starts with the reserved prefix, so the forwarding filter
/// always removes the broker's own cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerNames {
    prefix: ReservedPrefix,
    session_cookie: String,
    source_cookie: String,
    identity_header: HeaderName,
}

impl BrokerNames {
    fn derive(prefix: &str) -> Result<Self> {
        let identity = format!("{prefix}-User");
        let identity_header = HeaderName::from_bytes(identity.as_bytes())
            .map_err(|_| Error::invalid_header(identity.clone()))?;

        Ok(Self {
            prefix: ReservedPrefix::new(prefix),
            session_cookie: format!("{prefix}-Token"),
            source_cookie: format!("{prefix}-Source"),
            identity_header,
        })
    }

    /// The reserved name prefix.
    pub fn prefix(&self) -> &ReservedPrefix {
        &self.prefix
    }

    /// Name of the session credential cookie.
    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    /// Name of the redirect-source cookie.
    pub fn source_cookie(&self) -> &str {
        &self.source_cookie
    }

    /// Header carrying the resolved identity downstream.
    pub fn identity_header(&self) -> &HeaderName {
        &self.identity_header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BrokerConfig {
        BrokerConfig::new(
            "auth.example.com",
            "example.com",
            "https://auth.example.com/",
        )
    }

    #[test]
    fn valid_config_derives_prefixed_names() {
        let names = config().validate().expect("valid config");

        assert_eq!(names.session_cookie(), "X-Broker-Token");
        assert_eq!(names.source_cookie(), "X-Broker-Source");
        assert_eq!(names.identity_header().as_str(), "x-broker-user");
        assert!(names.prefix().is_reserved(names.session_cookie()));
        assert!(names.prefix().is_reserved(names.source_cookie()));
    }

    #[test]
    fn custom_prefix_flows_into_names() {
        let names = config()
            .with_reserved_prefix("X-Gate")
            .validate()
            .expect("valid config");

        assert_eq!(names.session_cookie(), "X-Gate-Token");
        assert_eq!(names.identity_header().as_str(), "x-gate-user");
    }

    #[test]
    fn empty_hostname_is_rejected() {
        let mut cfg = config();
        cfg.hostname = "  ".to_string();
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn cookie_scope_with_separator_is_rejected() {
        let mut cfg = config();
        cfg.cookie_scope = "example.com; Secure".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_cookie_scope_is_allowed() {
        let mut cfg = config();
        cfg.cookie_scope = String::new();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn relative_login_url_is_rejected() {
        let mut cfg = config();
        cfg.login_url = "/login".to_string();
        assert!(cfg.validate().is_err());

        cfg.login_url = "ftp://auth.example.com/".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn prefix_must_be_a_token() {
        let cfg = config().with_reserved_prefix("X Broker");
        assert!(cfg.validate().is_err());

        let cfg = config().with_reserved_prefix("");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deserializes_with_fqdn_alias_and_default_prefix() {
        let cfg: BrokerConfig = serde_json::from_str(
            r#"{
                "hostname": "auth.example.com",
                "cookie_scope": "example.com",
                "fqdn": "https://auth.example.com"
            }"#,
        )
        .expect("config should deserialize");

        assert_eq!(cfg.login_url, "https://auth.example.com");
        assert_eq!(cfg.reserved_prefix, DEFAULT_RESERVED_PREFIX);
    }

    #[test]
    fn primary_host_match_is_exact() {
        let cfg = config();
        assert!(cfg.is_primary_host("auth.example.com"));
        assert!(!cfg.is_primary_host("auth.example.com:8443"));
        assert!(!cfg.is_primary_host("app.example.com"));
    }
}
