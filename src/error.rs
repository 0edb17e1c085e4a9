use thiserror::Error;

/// Errors that can occur while configuring or running the gate.
///
/// None of these escape [`AccessGate::handle`](crate::AccessGate::handle):
/// request-time failures are folded into a terminal response there.
#[derive(Debug, Error)]
pub enum Error {
    /// The broker configuration failed validation.
    #[error("invalid broker configuration: {0}")]
    Config(String),

    /// A value could not be represented as an HTTP header.
    #[error("invalid header value for '{name}'")]
    InvalidHeader {
        /// Name of the header (or cookie) being built
        name: String,
    },

    /// The return-to URL could not be composed from the request.
    #[error("cannot compose return-to url for host '{host}': {source}")]
    ReturnUrl {
        /// Host taken from the request
        host: String,
        /// Underlying parse failure
        #[source]
        source: url::ParseError,
    },
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub(crate) fn invalid_header(name: impl Into<String>) -> Self {
        Error::InvalidHeader { name: name.into() }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
