//! States a request moves through inside the gate.
//!
//! ```text
//! Start -> Resolving -> Invalid
//!                    -> Checking -> DeniedRedirect
//!                                -> DeniedReject
//!                                -> Allowed
//! ```
//!
//! The non-terminal states also exist as zero-sized markers so the gate's
//! internal pass can only move forward: each transition consumes the pass.

use std::fmt;

/// Marker for a pass whose identity has not been resolved yet.
#[derive(Debug, Clone, Copy)]
pub struct Resolving {
    _private: (),
}

impl Resolving {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// Marker for a pass with a resolved identity awaiting the access check.
#[derive(Debug, Clone, Copy)]
pub struct Checking {
    _private: (),
}

impl Checking {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// A state of the gate's per-request state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateState {
    /// Request received
    Start,
    /// Identity being resolved
    Resolving,
    /// Identity resolved, access being evaluated
    Checking,
    /// Credential rejected: client error and session purge
    Invalid,
    /// Unauthenticated and denied: redirect to login
    DeniedRedirect,
    /// Authenticated and denied: access-denied response
    DeniedReject,
    /// Allowed: forwarded downstream
    Allowed,
}

impl GateState {
    /// True for states that end request handling.
    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    /// States reachable in one step.
    pub fn successors(self) -> &'static [GateState] {
        match self {
            GateState::Start => &[GateState::Resolving],
            GateState::Resolving => &[GateState::Invalid, GateState::Checking],
            GateState::Checking => &[
                GateState::DeniedRedirect,
                GateState::DeniedReject,
                GateState::Allowed,
            ],
            GateState::Invalid
            | GateState::DeniedRedirect
            | GateState::DeniedReject
            | GateState::Allowed => &[],
        }
    }

    /// True when `next` directly follows `self`.
    pub fn can_transition_to(self, next: GateState) -> bool {
        self.successors().contains(&next)
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GateState::Start => "start",
            GateState::Resolving => "resolving",
            GateState::Checking => "checking",
            GateState::Invalid => "invalid",
            GateState::DeniedRedirect => "denied_redirect",
            GateState::DeniedReject => "denied_reject",
            GateState::Allowed => "allowed",
        };
        f.write_str(name)
    }
}
