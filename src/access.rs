//! Access evaluation boundary.
//!
//! RBAC rules and their matching live outside this crate. The gate asks an
//! [`AccessEvaluator`] one question per request: may `user` reach `host`?

use crate::config::BrokerConfig;

/// Allow/deny answer for a `(user, host)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The request may proceed.
    Allow,
    /// The request is refused.
    Deny,
}

impl AccessDecision {
    /// True for [`AccessDecision::Allow`].
    pub fn is_allowed(self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

impl From<bool> for AccessDecision {
    fn from(allow: bool) -> Self {
        if allow {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny
        }
    }
}

/// Decides whether a user may access a host.
///
/// `user` is empty when the request carries no identity.
///
/// # Examples
///
/// ```
/// use broker_gate::{AccessDecision, AccessEvaluator, BrokerConfig};
///
/// let config = BrokerConfig::new("auth.example.com", "example.com", "https://auth.example.com");
/// let public_docs = |user: &str, host: &str, _: &BrokerConfig| {
///     AccessDecision::from(host == "docs.example.com" || !user.is_empty())
/// };
///
/// assert!(public_docs.evaluate("", "docs.example.com", &config).is_allowed());
/// assert!(!public_docs.evaluate("", "app.example.com", &config).is_allowed());
/// ```
pub trait AccessEvaluator {
    /// Evaluates access for `user` on `host` under `config`.
    fn evaluate(&self, user: &str, host: &str, config: &BrokerConfig) -> AccessDecision;
}

impl<F> AccessEvaluator for F
where
    F: Fn(&str, &str, &BrokerConfig) -> AccessDecision,
{
    fn evaluate(&self, user: &str, host: &str, config: &BrokerConfig) -> AccessDecision {
        self(user, host, config)
    }
}
