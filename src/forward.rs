//! Attaching the resolved identity to the forwarded request.

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Error, Result};

/// Writes the identity header on requests leaving the broker.
#[derive(Debug, Clone)]
pub struct HeaderInjector {
    header: HeaderName,
}

impl HeaderInjector {
    /// Creates an injector for `header`.
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }

    /// The identity header name.
    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Sets the identity header to `user`, replacing every value the
    /// client may have sent under the same name.
    ///
    /// `user` is empty for requests allowed without an identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if `user` is not a legal header
    /// value; `headers` is left untouched in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use broker_gate::HeaderInjector;
    /// use http::{HeaderMap, HeaderName};
    ///
    /// let injector = HeaderInjector::new(HeaderName::from_static("x-broker-user"));
    /// let mut headers = HeaderMap::new();
    /// headers.insert("x-broker-user", "mallory".parse().unwrap());
    ///
    /// injector.inject(&mut headers, "alice").unwrap();
    /// assert_eq!(headers.get_all("x-broker-user").iter().count(), 1);
    /// assert_eq!(headers["x-broker-user"], "alice");
    /// ```
    pub fn inject(&self, headers: &mut HeaderMap, user: &str) -> Result<()> {
        let value =
            HeaderValue::from_str(user).map_err(|_| Error::invalid_header(self.header.as_str()))?;
        headers.insert(self.header.clone(), value);
        Ok(())
    }
}
