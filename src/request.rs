//! Reading the pieces of a request the gate decides on.

use http::header::HOST;
use http::request::Parts;

/// The host the request was addressed to.
///
/// Taken from the URI authority when the request line carries an absolute
/// URL, falling back to the `Host` header, and empty when neither is
/// present. A port, if sent, is kept.
///
/// This is always the host the forwarded request is addressed to.
pub fn request_host(parts: &Parts) -> &str {
    parts
        .uri
        .authority()
        .map(|a| a.as_str())
        .or_else(|| parts.headers.get(HOST).and_then(|h| h.to_str().ok()))
        .unwrap_or("")
}

/// The request target: path plus query, exactly as received.
pub fn request_target(parts: &Parts) -> &str {
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
}
