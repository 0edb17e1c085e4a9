//! Cookie construction, serialization, parsing and filtering.
//!
//! The broker owns two cookies, both scoped to the shared cookie domain:
//! - the session credential cookie, only ever *cleared* by the gate
//! - the redirect-source cookie, carrying the pre-login destination
//!
//! Requests forwarded to a host other than the primary domain have every
//! cookie with the reserved name prefix removed before they leave the broker.

use std::fmt;

use http::header::COOKIE;
use http::{HeaderMap, HeaderValue};

use crate::config::BrokerNames;
use crate::error::{Error, Result};

/// Returns true when `s` is a non-empty RFC 7230 token.
pub(crate) fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'.'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'|'
                        | b'~'
                )
        })
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// `SameSite=Lax`
    Lax,
    /// `SameSite=Strict`
    Strict,
    /// `SameSite=None`
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Lax => write!(f, "Lax"),
            SameSite::Strict => write!(f, "Strict"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// The two cookies owned by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieKind {
    /// The session credential cookie.
    SessionToken,
    /// The cookie carrying the pre-authentication destination.
    RedirectSource,
}

/// A cookie to be emitted in a `Set-Cookie` header.
///
/// `Display` renders the `Set-Cookie` value. A negative `max_age` means
/// "expire now" and is written as `Max-Age=0`; zero means no `Max-Age`.
///
/// # Examples
///
/// ```
/// use broker_gate::{BrokerConfig, CookieGovernor};
///
/// let config = BrokerConfig::new("auth.example.com", "example.com", "https://auth.example.com");
/// let governor = CookieGovernor::new(&config).unwrap();
///
/// let clear = governor.clear_session();
/// assert!(clear.max_age() < 0);
/// assert_eq!(
///     clear.to_string(),
///     "X-Broker-Token=; Path=/; Domain=example.com; Max-Age=0; HttpOnly; Secure; SameSite=Lax"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSpec {
    kind: CookieKind,
    name: String,
    value: String,
    domain: String,
    path: String,
    max_age: i64,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl CookieSpec {
    /// Which broker cookie this is.
    pub fn kind(&self) -> CookieKind {
        self.kind
    }

    /// Cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie value as it will be written (already sanitized).
    pub fn value(&self) -> &str {
        &self.value
    }

    /// `Domain` attribute, empty for host-only cookies.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `Path` attribute.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Max-age in seconds; negative expires the cookie immediately.
    pub fn max_age(&self) -> i64 {
        self.max_age
    }

    /// Whether the `Secure` attribute is set.
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Whether the `HttpOnly` attribute is set.
    pub fn http_only(&self) -> bool {
        self.http_only
    }

    /// `SameSite` attribute, if any.
    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    /// Renders the cookie as a `Set-Cookie` header value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the rendered cookie is not a
    /// legal header value.
    pub fn to_header_value(&self) -> Result<HeaderValue> {
        HeaderValue::try_from(self.to_string()).map_err(|_| Error::invalid_header(&self.name))
    }
}

impl fmt::Display for CookieSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if !self.path.is_empty() {
            write!(f, "; Path={}", self.path)?;
        }
        let domain = self.domain.strip_prefix('.').unwrap_or(self.domain.as_str());
        if !domain.is_empty() {
            write!(f, "; Domain={domain}")?;
        }
        if self.max_age > 0 {
            write!(f, "; Max-Age={}", self.max_age)?;
        } else if self.max_age < 0 {
            write!(f, "; Max-Age=0")?;
        }
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        if self.secure {
            write!(f, "; Secure")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={same_site}")?;
        }
        Ok(())
    }
}

/// Drops bytes that may not appear in a cookie value and quotes values
/// containing a space or comma.
fn sanitize_value(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|&c| (' '..'\x7f').contains(&c) && !matches!(c, '"' | ';' | '\\'))
        .collect();

    if kept.contains(' ') || kept.contains(',') {
        format!("\"{kept}\"")
    } else {
        kept
    }
}

/// Predicate over cookie names selecting the broker's reserved names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedPrefix(String);

impl ReservedPrefix {
    /// Creates a predicate for the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// The prefix itself.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `name` belongs to the broker.
    ///
    /// Any application cookie that happens to share the prefix is also
    /// matched.
    pub fn is_reserved(&self, name: &str) -> bool {
        name.starts_with(self.0.as_str())
    }

    /// True when a cookie named `name` may be forwarded downstream.
    pub fn allows(&self, name: &str) -> bool {
        !self.is_reserved(name)
    }
}

/// A cookie as presented by the client.
///
/// The value is kept exactly as sent so forwarded cookies are unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestCookie {
    /// Cookie name
    pub name: String,
    /// Raw cookie value, including any surrounding quotes
    pub value: String,
}

impl RequestCookie {
    /// The value with one pair of surrounding double quotes removed.
    pub fn unquoted_value(&self) -> &str {
        let v = self.value.as_str();
        if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
            &v[1..v.len() - 1]
        } else {
            v
        }
    }
}

impl fmt::Display for RequestCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Parses every `Cookie` header in order.
///
/// Fragments without `=`, with an invalid name, or in a header that is not
/// visible ASCII are skipped.
pub fn parse_request_cookies(headers: &HeaderMap) -> Vec<RequestCookie> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if !is_token(name) {
                return None;
            }
            Some(RequestCookie {
                name: name.to_string(),
                value: value.trim().to_string(),
            })
        })
        .collect()
}

/// Rebuilds the request's cookie set keeping only names `prefix` allows.
///
/// All `Cookie` headers are replaced by a single header holding the kept
/// cookies in their original order, or removed entirely when none remain.
/// Returns the number of cookies removed.
///
/// # Examples
///
/// ```
/// use broker_gate::{strip_reserved_cookies, ReservedPrefix};
/// use http::{header::COOKIE, HeaderMap, HeaderValue};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(COOKIE, HeaderValue::from_static("a=1; X-Broker-Token=t; b=2"));
///
/// let removed = strip_reserved_cookies(&mut headers, &ReservedPrefix::new("X-Broker"));
/// assert_eq!(removed, 1);
/// assert_eq!(headers[COOKIE], "a=1; b=2");
/// ```
pub fn strip_reserved_cookies(headers: &mut HeaderMap, prefix: &ReservedPrefix) -> usize {
    let cookies = parse_request_cookies(headers);
    let total = cookies.len();
    let kept: Vec<String> = cookies
        .into_iter()
        .filter(|c| prefix.allows(&c.name))
        .map(|c| c.to_string())
        .collect();
    let removed = total - kept.len();

    headers.remove(COOKIE);
    if !kept.is_empty() {
        // Rebuilt only from pairs that parsed out of valid header values.
        if let Ok(value) = HeaderValue::try_from(kept.join("; ")) {
            headers.insert(COOKIE, value);
        }
    }

    removed
}

/// Builds the broker's cookies with the configured domain scope.
#[derive(Debug, Clone)]
pub struct CookieGovernor {
    names: BrokerNames,
    scope: String,
}

impl CookieGovernor {
    /// Creates a governor from a configuration.
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not validate.
    pub fn new(config: &crate::BrokerConfig) -> Result<Self> {
        let names = config.validate()?;
        Ok(Self::from_parts(names, config.cookie_scope.clone()))
    }

    pub(crate) fn from_parts(names: BrokerNames, scope: String) -> Self {
        Self { names, scope }
    }

    /// The broker's names.
    pub fn names(&self) -> &BrokerNames {
        &self.names
    }

    /// A cookie that immediately expires the session credential.
    pub fn clear_session(&self) -> CookieSpec {
        CookieSpec {
            kind: CookieKind::SessionToken,
            name: self.names.session_cookie().to_string(),
            value: String::new(),
            domain: self.scope.clone(),
            path: "/".to_string(),
            max_age: -1,
            secure: true,
            http_only: true,
            same_site: Some(SameSite::Lax),
        }
    }

    /// A session cookie carrying the URL to return to after login.
    pub fn redirect_source(&self, return_to: &str) -> CookieSpec {
        CookieSpec {
            kind: CookieKind::RedirectSource,
            name: self.names.source_cookie().to_string(),
            value: sanitize_value(return_to),
            domain: self.scope.clone(),
            path: "/".to_string(),
            max_age: 0,
            secure: true,
            http_only: true,
            same_site: None,
        }
    }

    /// Looks up the session credential cookie on an incoming request.
    ///
    /// Returns the first matching cookie's unquoted value.
    pub fn session_value(&self, headers: &HeaderMap) -> Option<String> {
        parse_request_cookies(headers)
            .into_iter()
            .find(|c| c.name == self.names.session_cookie())
            .map(|c| c.unquoted_value().to_string())
    }

    /// Removes every reserved cookie from `headers`. See [`strip_reserved_cookies`].
    pub fn strip_reserved(&self, headers: &mut HeaderMap) -> usize {
        strip_reserved_cookies(headers, self.names.prefix())
    }
}
