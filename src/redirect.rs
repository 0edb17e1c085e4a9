//! Return-to URL composition and the redirect to the login service.
//!
//! The return-to URL always uses `https` and the request's own host, kept
//! as sent (case and port included). The whole request target, query
//! included, becomes the URL *path*: a `?` in the target is therefore
//! percent-encoded as `%3F` rather than starting a query. The path is
//! escaped, never parsed, so dot segments such as `/a/../b` survive
//! verbatim. Existing percent escapes are left as they are, so decoding the
//! path does not always reproduce the exact target that was requested.

use http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::{HeaderValue, Method, Response, StatusCode};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::config::BrokerConfig;
use crate::cookie::CookieSpec;
use crate::error::{Error, Result};

/// Scheme used for every return-to URL.
pub const RETURN_SCHEME: &str = "https";

/// Bytes escaped in the return-to path: everything outside the unreserved
/// set and the path sub-delimiters. `?` and `#` are escaped; `%` is not.
const RETURN_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b'/')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'@')
    .remove(b'%');

/// Composes `https://{host}{target}` with `target` treated as a path.
///
/// # Errors
///
/// Returns [`Error::ReturnUrl`] when `host` is empty, carries URL
/// delimiters, or is not a valid host.
///
/// # Examples
///
/// ```
/// use broker_gate::compose_return_url;
///
/// let url = compose_return_url("app.example.com", "/dash").unwrap();
/// assert_eq!(url, "https://app.example.com/dash");
///
/// let url = compose_return_url("app.example.com", "/find?q=1").unwrap();
/// assert_eq!(url, "https://app.example.com/find%3Fq=1");
/// ```
pub fn compose_return_url(host: &str, target: &str) -> Result<String> {
    let invalid = |source| Error::ReturnUrl {
        host: host.to_string(),
        source,
    };

    if host.contains(&['/', '?', '#', '@', '\\'][..]) {
        return Err(invalid(url::ParseError::InvalidDomainCharacter));
    }
    // Parsed only to validate; the host is emitted exactly as sent.
    Url::parse(&format!("{RETURN_SCHEME}://{host}/")).map_err(invalid)?;

    let slash = if target.is_empty() || target.starts_with('/') {
        ""
    } else {
        "/"
    };
    let path = utf8_percent_encode(target, RETURN_PATH);
    Ok(format!("{RETURN_SCHEME}://{host}{slash}{path}"))
}

/// Builds the redirect to the login entry point.
#[derive(Debug, Clone)]
pub struct RedirectComposer {
    location: HeaderValue,
    found_body: String,
}

impl RedirectComposer {
    /// Creates a composer pointing at `config.login_url`.
    ///
    /// # Errors
    ///
    /// Fails if the login URL cannot be used as a `Location` header.
    pub fn new(config: &BrokerConfig) -> Result<Self> {
        let location = HeaderValue::from_str(&config.login_url)
            .map_err(|_| Error::invalid_header(LOCATION.as_str()))?;
        let found_body = format!(
            "<a href=\"{}\">Found</a>.\n\n",
            html_escape(&config.login_url)
        );
        Ok(Self {
            location,
            found_body,
        })
    }

    /// The configured login endpoint.
    pub fn location(&self) -> &HeaderValue {
        &self.location
    }

    /// A `302 Found` to the login endpoint that sets `source`.
    ///
    /// `GET` and `HEAD` get an HTML content type, and `GET` also gets a
    /// short link body for clients that do not follow redirects. Other
    /// methods get an empty body.
    ///
    /// # Errors
    ///
    /// Fails if the cookie cannot be rendered as a header value.
    pub fn login_redirect(
        &self,
        method: &Method,
        source: &CookieSpec,
    ) -> Result<Response<String>> {
        let body = if *method == Method::GET {
            self.found_body.clone()
        } else {
            String::new()
        };

        let mut response = Response::new(body);
        *response.status_mut() = StatusCode::FOUND;
        let headers = response.headers_mut();
        headers.insert(LOCATION, self.location.clone());
        if *method == Method::GET || *method == Method::HEAD {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
        }
        headers.append(SET_COOKIE, source.to_header_value()?);
        Ok(response)
    }
}

fn html_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
