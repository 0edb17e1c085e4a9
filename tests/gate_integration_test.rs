//! End-to-end flows through the access gate.
//!
//! These tests drive full requests through `AccessGate` with the cookie-based
//! identity resolver and a small host policy, and check the terminal action.

use std::sync::Arc;

use broker_gate::{
    AccessDecision, AccessGate, BrokerConfig, CookieIdentityResolver, CredentialError, GateState,
    LogRecord, MemoryLog, Outcome, SessionCredential, TokenValidator,
};
use http::header::{COOKIE, HOST, LOCATION, SET_COOKIE};
use http::{Request, StatusCode};

fn config() -> Arc<BrokerConfig> {
    Arc::new(BrokerConfig::new(
        "auth.example.com",
        "example.com",
        "https://auth.example.com/",
    ))
}

fn validator() -> impl TokenValidator {
    |credential: &SessionCredential| match credential.expose_token() {
        "tok-alice" => Ok("alice".to_string()),
        "tok-bob" => Ok("bob".to_string()),
        _ => Err(CredentialError::new("token signature mismatch")),
    }
}

/// alice may use app and auth; bob only auth; anonymous only docs.
fn policy(user: &str, host: &str, config: &BrokerConfig) -> AccessDecision {
    let allowed = match user {
        "alice" => host == "app.example.com" || host == config.hostname,
        "bob" => host == config.hostname,
        _ => host == "docs.example.com",
    };
    AccessDecision::from(allowed)
}

fn request(host: &str, uri: &str, cookie: Option<&str>) -> Request<()> {
    let mut builder = Request::builder().uri(uri).header(HOST, host);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(()).unwrap()
}

fn set_cookies(outcome: &Outcome<()>) -> Vec<String> {
    outcome
        .response()
        .map(|r| {
            r.headers()
                .get_all(SET_COOKIE)
                .iter()
                .map(|v| v.to_str().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn authenticated_user_on_app_host_is_forwarded_without_broker_cookies() {
    let config = config();
    let resolver = CookieIdentityResolver::new(&config, validator()).unwrap();
    let gate = AccessGate::new(config, resolver, policy).unwrap();

    let outcome = gate.handle(request(
        "app.example.com",
        "/dash",
        Some("X-Broker-Token=tok-alice; session=app-123"),
    ));

    assert_eq!(outcome.state(), GateState::Allowed);
    assert!(set_cookies(&outcome).is_empty());

    let forwarded = outcome.into_response().unwrap_err();
    assert_eq!(forwarded.headers()["x-broker-user"], "alice");
    assert_eq!(forwarded.headers()[COOKIE], "session=app-123");
    assert!(forwarded.headers().get(LOCATION).is_none());
}

#[test]
fn anonymous_user_is_sent_to_login_with_return_url() {
    let config = config();
    let resolver = CookieIdentityResolver::new(&config, validator()).unwrap();
    let gate = AccessGate::new(config, resolver, policy).unwrap();

    let outcome = gate.handle(request("app.example.com", "/dash", None));

    assert_eq!(outcome.state(), GateState::DeniedRedirect);
    let response = outcome.response().unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[LOCATION], "https://auth.example.com/");
    assert_eq!(
        set_cookies(&outcome),
        ["X-Broker-Source=https://app.example.com/dash; Path=/; Domain=example.com; HttpOnly; Secure"]
    );
}

#[test]
fn tampered_token_is_purged_and_rejected() {
    let config = config();
    let log = MemoryLog::new();
    let resolver = CookieIdentityResolver::new(&config, validator()).unwrap();
    let gate = AccessGate::new(config, resolver, policy)
        .unwrap()
        .with_log(&log);

    let outcome = gate.handle(request(
        "app.example.com",
        "/dash",
        Some("X-Broker-Token=tok-alice-but-edited"),
    ));

    assert_eq!(outcome.state(), GateState::Invalid);
    assert_eq!(
        outcome.response().unwrap().status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        set_cookies(&outcome),
        ["X-Broker-Token=; Path=/; Domain=example.com; Max-Age=0; HttpOnly; Secure; SameSite=Lax"]
    );
    assert_eq!(
        log.records(),
        [LogRecord::CredentialRejected {
            host: "app.example.com".into(),
            cause: "token signature mismatch".into(),
        }]
    );
}

#[test]
fn authenticated_but_unauthorized_is_denied() {
    let config = config();
    let resolver = CookieIdentityResolver::new(&config, validator()).unwrap();
    let gate = AccessGate::new(config, resolver, policy).unwrap();

    let outcome = gate.handle(request(
        "app.example.com",
        "/dash",
        Some("X-Broker-Token=tok-bob"),
    ));

    assert_eq!(outcome.state(), GateState::DeniedReject);
    assert_eq!(
        outcome.response().unwrap().status(),
        StatusCode::UNAUTHORIZED
    );
    assert!(set_cookies(&outcome).is_empty());
}

#[test]
fn primary_host_keeps_cookies_byte_identical() {
    let config = config();
    let resolver = CookieIdentityResolver::new(&config, validator()).unwrap();
    let gate = AccessGate::new(config, resolver, policy).unwrap();

    let original = "X-Broker-Token=tok-bob;X-Broker-Source=\"https://a\";  theme=dark";
    let outcome = gate.handle(request("auth.example.com", "/", Some(original)));

    let forwarded = outcome.into_response().unwrap_err();
    assert_eq!(forwarded.headers()["x-broker-user"], "bob");
    assert_eq!(forwarded.headers()[COOKIE], original);
}

#[test]
fn anonymous_allowed_request_carries_empty_identity() {
    let config = config();
    let resolver = CookieIdentityResolver::new(&config, validator()).unwrap();
    let gate = AccessGate::new(config, resolver, policy).unwrap();

    let mut req = request("docs.example.com", "/guide", Some("lang=en"));
    req.headers_mut()
        .insert("x-broker-user", "admin".parse().unwrap());

    let forwarded = gate.handle(req).into_response().unwrap_err();

    assert_eq!(forwarded.headers()["x-broker-user"], "");
    assert_eq!(forwarded.headers()[COOKIE], "lang=en");
    assert_eq!(forwarded.uri(), "/guide");
}

#[test]
fn every_evaluation_is_logged_with_host_user_and_target() {
    let config = config();
    let log = MemoryLog::new();
    let resolver = CookieIdentityResolver::new(&config, validator()).unwrap();
    let gate = AccessGate::new(config, resolver, policy)
        .unwrap()
        .with_log(&log);

    gate.handle(request("app.example.com", "/a?b=1", Some("X-Broker-Token=tok-alice")));
    gate.handle(request("app.example.com", "/dash", None));

    assert_eq!(
        log.records(),
        [
            LogRecord::CheckingAccess {
                host: "app.example.com".into(),
                user: "alice".into(),
                uri: "/a?b=1".into(),
            },
            LogRecord::CheckingAccess {
                host: "app.example.com".into(),
                user: "".into(),
                uri: "/dash".into(),
            },
        ]
    );
}

#[test]
fn absolute_target_is_judged_by_its_own_host() {
    let config = config();
    let resolver = CookieIdentityResolver::new(&config, validator()).unwrap();
    let gate = AccessGate::new(config, resolver, policy).unwrap();

    // bob may use auth.example.com only; the request line names app.
    let outcome = gate.handle(request(
        "auth.example.com",
        "https://app.example.com/secret",
        Some("X-Broker-Token=tok-bob; a=1"),
    ));

    assert_eq!(outcome.state(), GateState::DeniedReject);
    assert_eq!(
        outcome.response().unwrap().status(),
        StatusCode::UNAUTHORIZED
    );
    assert!(outcome.forwarded().is_none());
}

#[test]
fn absolute_target_on_allowed_host_strips_by_that_host() {
    let config = config();
    let resolver = CookieIdentityResolver::new(&config, validator()).unwrap();
    let gate = AccessGate::new(config, resolver, policy).unwrap();

    // The Host header names the primary host, the request line does not.
    let forwarded = gate
        .handle(request(
            "auth.example.com",
            "https://app.example.com/dash",
            Some("X-Broker-Token=tok-alice; a=1"),
        ))
        .into_response()
        .unwrap_err();

    assert_eq!(forwarded.headers()["x-broker-user"], "alice");
    assert_eq!(forwarded.headers()[COOKIE], "a=1");
}

#[test]
fn login_redirect_keeps_dot_segments_and_links_to_login() {
    let config = config();
    let resolver = CookieIdentityResolver::new(&config, validator()).unwrap();
    let gate = AccessGate::new(config, resolver, policy).unwrap();

    let outcome = gate.handle(request("App.Example.com", "/a/../b", None));

    let cookies = set_cookies(&outcome);
    assert!(cookies[0].starts_with("X-Broker-Source=https://App.Example.com/a/../b;"));
    assert_eq!(
        outcome.response().unwrap().body(),
        "<a href=\"https://auth.example.com/\">Found</a>.\n\n"
    );
}

#[test]
fn return_url_folds_query_into_path() {
    let config = config();
    let resolver = CookieIdentityResolver::new(&config, validator()).unwrap();
    let gate = AccessGate::new(config, resolver, policy).unwrap();

    let outcome = gate.handle(request("app.example.com", "/search?q=rust", None));

    let cookies = set_cookies(&outcome);
    assert!(cookies[0].starts_with("X-Broker-Source=https://app.example.com/search%3Fq=rust;"));
}

#[test]
fn one_gate_serves_concurrent_requests() {
    let config = config();
    let resolver = CookieIdentityResolver::new(&config, validator()).unwrap();
    let gate = Arc::new(AccessGate::new(config, resolver, policy).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || {
                let cookie = if i % 2 == 0 {
                    "X-Broker-Token=tok-alice"
                } else {
                    "X-Broker-Token=garbage"
                };
                gate.handle(request("app.example.com", "/", Some(cookie))).state()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let state = handle.join().unwrap();
        let expected = if i % 2 == 0 {
            GateState::Allowed
        } else {
            GateState::Invalid
        };
        assert_eq!(state, expected);
    }
}
