//! Per-request authorization gate for a multi-host reverse-proxy access broker.
//!
//! Several hostnames share one authentication domain and one cookie scope.
//! For every request the gate:
//! - **resolves identity** through an [`IdentityResolver`] into a three-way
//!   [`IdentityResult`], keeping "no credential" apart from "bad credential"
//! - **evaluates access** for the request's host through an [`AccessEvaluator`]
//! - **takes exactly one terminal action**: purge the session and reject,
//!   redirect to login, deny, or forward
//! - **sanitizes cookies** so broker-owned cookies never reach applications
//!   on hosts other than the primary domain
//!
//! # Core Types
//!
//! - [`AccessGate`]: the orchestrator, producing an [`Outcome`]
//! - [`BrokerConfig`]: read-only process-wide configuration
//! - [`CookieGovernor`]: builds, clears and filters broker cookies
//! - [`RedirectComposer`]: return-to URL and login redirect
//! - [`HeaderInjector`]: identity header on forwarded requests
//! - [`GateLog`]: injected logging sink ([`TracingLog`] by default)
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use broker_gate::{
//!     AccessDecision, AccessGate, BrokerConfig, CookieIdentityResolver, CredentialError,
//!     SessionCredential,
//! };
//! use http::Request;
//!
//! let config = Arc::new(BrokerConfig::new(
//!     "auth.example.com",
//!     "example.com",
//!     "https://auth.example.com/",
//! ));
//!
//! let validator = |c: &SessionCredential| match c.expose_token() {
//!     "token-for-alice" => Ok("alice".to_string()),
//!     _ => Err(CredentialError::new("unknown token")),
//! };
//! let resolver = CookieIdentityResolver::new(&config, validator).unwrap();
//! let policy = |user: &str, host: &str, _: &BrokerConfig| {
//!     AccessDecision::from(user == "alice" && host == "app.example.com")
//! };
//!
//! let gate = AccessGate::new(config, resolver, policy).unwrap();
//!
//! let request = Request::builder()
//!     .uri("/dash")
//!     .header("host", "app.example.com")
//!     .header("cookie", "X-Broker-Token=token-for-alice; theme=dark")
//!     .body(())
//!     .unwrap();
//!
//! let forwarded = gate.handle(request).into_response().unwrap_err();
//! assert_eq!(forwarded.headers()["x-broker-user"], "alice");
//! assert_eq!(forwarded.headers()["cookie"], "theme=dark");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod config;
mod cookie;
mod credential;
mod error;
mod forward;
mod gate;
mod identity;
mod logging;
mod redirect;
mod request;
mod state;

pub use access::{AccessDecision, AccessEvaluator};
pub use config::{BrokerConfig, BrokerNames, DEFAULT_RESERVED_PREFIX};
pub use cookie::{
    parse_request_cookies, strip_reserved_cookies, CookieGovernor, CookieKind, CookieSpec,
    RequestCookie, ReservedPrefix, SameSite,
};
pub use credential::SessionCredential;
pub use error::{Error, Result};
pub use forward::HeaderInjector;
pub use gate::{AccessGate, Outcome};
pub use identity::{
    CookieIdentityResolver, CredentialError, IdentityResolver, IdentityResult, TokenValidator,
};
pub use logging::{GateLog, LogRecord, MemoryLog, TracingLog};
pub use redirect::{compose_return_url, RedirectComposer, RETURN_SCHEME};
pub use request::{request_host, request_target};
pub use state::{Checking, GateState, Resolving};
