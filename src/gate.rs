use std::sync::Arc;

use http::header::{CONTENT_TYPE, SET_COOKIE, X_CONTENT_TYPE_OPTIONS};
use http::request::Parts;
use http::{HeaderValue, Method, Request, Response, StatusCode};

use crate::access::{AccessDecision, AccessEvaluator};
use crate::config::BrokerConfig;
use crate::cookie::CookieGovernor;
use crate::error::Result;
use crate::forward::HeaderInjector;
use crate::identity::{CredentialError, IdentityResolver, IdentityResult};
use crate::logging::{GateLog, TracingLog};
use crate::redirect::{compose_return_url, RedirectComposer};
use crate::request::{request_host, request_target};
use crate::state::{Checking, GateState, Resolving};

/// Terminal result of running a request through the [`AccessGate`].
///
/// Exactly one of these is produced per request.
#[derive(Debug)]
pub enum Outcome<B> {
    /// The credential was malformed or tampered with: `400` plus a cookie
    /// expiring the session credential.
    Rejected(Response<String>),
    /// No identity and access denied: `302` to the login endpoint plus the
    /// redirect-source cookie.
    Redirected(Response<String>),
    /// Identity known but access denied: `401`, no cookies.
    Denied(Response<String>),
    /// Access allowed: the request to hand to the downstream handler.
    Forwarded(Request<B>),
}

impl<B> Outcome<B> {
    /// The terminal state this outcome corresponds to.
    pub fn state(&self) -> GateState {
        match self {
            Outcome::Rejected(_) => GateState::Invalid,
            Outcome::Redirected(_) => GateState::DeniedRedirect,
            Outcome::Denied(_) => GateState::DeniedReject,
            Outcome::Forwarded(_) => GateState::Allowed,
        }
    }

    /// The response to send, if the gate answered the request itself.
    pub fn response(&self) -> Option<&Response<String>> {
        match self {
            Outcome::Rejected(r) | Outcome::Redirected(r) | Outcome::Denied(r) => Some(r),
            Outcome::Forwarded(_) => None,
        }
    }

    /// The request to forward, if access was allowed.
    pub fn forwarded(&self) -> Option<&Request<B>> {
        match self {
            Outcome::Forwarded(req) => Some(req),
            _ => None,
        }
    }

    /// Splits the outcome into the gate's own response or the request to
    /// forward.
    pub fn into_response(self) -> std::result::Result<Response<String>, Request<B>> {
        match self {
            Outcome::Rejected(r) | Outcome::Redirected(r) | Outcome::Denied(r) => Ok(r),
            Outcome::Forwarded(req) => Err(req),
        }
    }
}

enum Identity {
    User(String),
    Anonymous,
}

impl Identity {
    fn user(&self) -> &str {
        match self {
            Identity::User(user) => user,
            Identity::Anonymous => "",
        }
    }
}

/// A request head moving through the gate; every step consumes it.
struct Pass<S> {
    parts: Parts,
    identity: Identity,
    _state: S,
}

impl Pass<Resolving> {
    fn start(parts: Parts) -> Self {
        Self {
            parts,
            identity: Identity::Anonymous,
            _state: Resolving::new(),
        }
    }

    /// Asks the resolver about the untouched request head.
    fn resolve(
        self,
        resolver: &impl IdentityResolver,
    ) -> std::result::Result<Pass<Checking>, (Parts, CredentialError)> {
        let identity = match resolver.resolve(&self.parts) {
            IdentityResult::Authenticated { user } => Identity::User(user),
            IdentityResult::Unauthenticated => Identity::Anonymous,
            IdentityResult::Invalid { cause } => return Err((self.parts, cause)),
        };

        Ok(Pass {
            parts: self.parts,
            identity,
            _state: Checking::new(),
        })
    }
}

/// The per-request authorization gate.
///
/// `AccessGate` resolves the identity behind a request, evaluates access for
/// the request's host and takes exactly one terminal action:
///
/// | identity | access | outcome |
/// |---|---|---|
/// | invalid | - | [`Outcome::Rejected`] |
/// | none | deny | [`Outcome::Redirected`] |
/// | user | deny | [`Outcome::Denied`] |
/// | any | allow | [`Outcome::Forwarded`] |
///
/// Forwarded requests carry the identity header. When the host is not the
/// primary domain, every cookie with the reserved prefix is also removed.
///
/// The gate holds no per-request state; one instance serves all requests
/// concurrently when its collaborators are `Sync`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use broker_gate::{AccessDecision, AccessGate, BrokerConfig, IdentityResult, Outcome};
/// use http::request::Parts;
/// use http::Request;
///
/// let config = Arc::new(BrokerConfig::new(
///     "auth.example.com",
///     "example.com",
///     "https://auth.example.com/",
/// ));
/// let gate = AccessGate::new(
///     config,
///     |_: &Parts| IdentityResult::Unauthenticated,
///     |user: &str, _: &str, _: &BrokerConfig| AccessDecision::from(!user.is_empty()),
/// )
/// .unwrap();
///
/// let request = Request::builder()
///     .uri("/dash")
///     .header("host", "app.example.com")
///     .body(())
///     .unwrap();
///
/// let outcome = gate.handle(request);
/// assert!(matches!(outcome, Outcome::Redirected(_)));
/// ```
pub struct AccessGate<R, E, L = TracingLog> {
    config: Arc<BrokerConfig>,
    cookies: CookieGovernor,
    redirect: RedirectComposer,
    injector: HeaderInjector,
    resolver: R,
    evaluator: E,
    log: L,
}

impl<R, E> AccessGate<R, E, TracingLog>
where
    R: IdentityResolver,
    E: AccessEvaluator,
{
    /// Creates a gate logging through `tracing`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if `config` does not
    /// validate, or [`Error::InvalidHeader`](crate::Error::InvalidHeader) if
    /// the login URL cannot be used as a `Location`.
    pub fn new(config: Arc<BrokerConfig>, resolver: R, evaluator: E) -> Result<Self> {
        let names = config.validate()?;
        let redirect = RedirectComposer::new(&config)?;
        let injector = HeaderInjector::new(names.identity_header().clone());
        let cookies = CookieGovernor::from_parts(names, config.cookie_scope.clone());

        Ok(Self {
            config,
            cookies,
            redirect,
            injector,
            resolver,
            evaluator,
            log: TracingLog,
        })
    }
}

impl<R, E, L> AccessGate<R, E, L> {
    /// Replaces the logging sink.
    pub fn with_log<M: GateLog>(self, log: M) -> AccessGate<R, E, M> {
        AccessGate {
            config: self.config,
            cookies: self.cookies,
            redirect: self.redirect,
            injector: self.injector,
            resolver: self.resolver,
            evaluator: self.evaluator,
            log,
        }
    }

    /// The configuration the gate was built with.
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// The gate's cookie governor.
    pub fn cookies(&self) -> &CookieGovernor {
        &self.cookies
    }
}

impl<R, E, L> AccessGate<R, E, L>
where
    R: IdentityResolver,
    E: AccessEvaluator,
    L: GateLog,
{
    /// Runs one request through the gate.
    ///
    /// The request is consumed. Headers are only modified after identity
    /// resolution and only on the request returned in
    /// [`Outcome::Forwarded`]. The body is passed through untouched.
    pub fn handle<B>(&self, request: Request<B>) -> Outcome<B> {
        let (parts, body) = request.into_parts();

        let outcome = match Pass::start(parts).resolve(&self.resolver) {
            Ok(pass) => self.check(pass, body),
            Err((parts, cause)) => {
                self.log.credential_rejected(request_host(&parts), &cause);
                self.reject_invalid()
            }
        };

        tracing::debug!(state = %outcome.state(), "request finished at gate");
        outcome
    }

    fn check<B>(&self, pass: Pass<Checking>, body: B) -> Outcome<B> {
        let host = request_host(&pass.parts).to_string();
        let target = request_target(&pass.parts).to_string();
        let anonymous = matches!(pass.identity, Identity::Anonymous);
        let user = pass.identity.user();

        self.log.checking_access(&host, user, &target);
        let decision = self.evaluator.evaluate(user, &host, &self.config);

        match (decision, anonymous) {
            (AccessDecision::Deny, true) => {
                self.redirect_to_login(&pass.parts.method, &host, &target)
            }
            (AccessDecision::Deny, false) => {
                Outcome::Denied(plain_error(StatusCode::UNAUTHORIZED, "access denied"))
            }
            (AccessDecision::Allow, _) => self.forward(pass, body, &host),
        }
    }

    fn redirect_to_login<B>(&self, method: &Method, host: &str, target: &str) -> Outcome<B> {
        let redirect = compose_return_url(host, target).and_then(|url| {
            let source = self.cookies.redirect_source(&url);
            self.redirect.login_redirect(method, &source)
        });

        match redirect {
            Ok(response) => Outcome::Redirected(response),
            Err(err) => {
                self.log.response_failed(GateState::DeniedRedirect, &err);
                self.reject_invalid()
            }
        }
    }

    fn forward<B>(&self, pass: Pass<Checking>, body: B, host: &str) -> Outcome<B> {
        let Pass {
            mut parts,
            identity,
            ..
        } = pass;

        // A user name that cannot travel as a header came from a corrupt credential.
        if let Err(err) = self.injector.inject(&mut parts.headers, identity.user()) {
            self.log.response_failed(GateState::Allowed, &err);
            return self.reject_invalid();
        }

        if !self.config.is_primary_host(host) {
            self.cookies.strip_reserved(&mut parts.headers);
        }

        Outcome::Forwarded(Request::from_parts(parts, body))
    }

    fn reject_invalid<B>(&self) -> Outcome<B> {
        let mut response = plain_error(StatusCode::BAD_REQUEST, "bad request");
        match self.cookies.clear_session().to_header_value() {
            Ok(cookie) => {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
            Err(err) => self.log.response_failed(GateState::Invalid, &err),
        }
        Outcome::Rejected(response)
    }
}

fn plain_error(status: StatusCode, message: &str) -> Response<String> {
    let mut response = Response::new(format!("{message}\n"));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}
