//! Logging sink used by the gate.
//!
//! The sink is handed to the gate explicitly. Every method returns `()`:
//! emitting a record can never change or abort request handling.

use std::sync::{Mutex, PoisonError};

use crate::error::Error;
use crate::identity::CredentialError;
use crate::state::GateState;

/// Receives the gate's log records.
pub trait GateLog {
    /// Called before every access evaluation.
    fn checking_access(&self, host: &str, user: &str, uri: &str);

    /// Called when a presented credential fails validation.
    fn credential_rejected(&self, host: &str, cause: &CredentialError);

    /// Called when the gate cannot complete the terminal action for `state`
    /// and answers with the invalid-credential response instead.
    fn response_failed(&self, state: GateState, error: &Error);
}

impl<L: GateLog + ?Sized> GateLog for &L {
    fn checking_access(&self, host: &str, user: &str, uri: &str) {
        (**self).checking_access(host, user, uri);
    }

    fn credential_rejected(&self, host: &str, cause: &CredentialError) {
        (**self).credential_rejected(host, cause);
    }

    fn response_failed(&self, state: GateState, error: &Error) {
        (**self).response_failed(state, error);
    }
}

/// Default sink emitting `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl GateLog for TracingLog {
    fn checking_access(&self, host: &str, user: &str, uri: &str) {
        tracing::debug!(host = %host, user = %user, uri = %uri, "checking auth");
    }

    fn credential_rejected(&self, host: &str, cause: &CredentialError) {
        tracing::error!(host = %host, error = %cause, "unable to extract user");
    }

    fn response_failed(&self, state: GateState, error: &Error) {
        tracing::error!(state = %state, error = %error, "falling back to bad request");
    }
}

/// A record captured by [`MemoryLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// Debug record preceding access evaluation
    CheckingAccess {
        /// Request host
        host: String,
        /// Resolved user, empty if none
        user: String,
        /// Request target
        uri: String,
    },
    /// Error record for a rejected credential
    CredentialRejected {
        /// Request host
        host: String,
        /// Rendered cause
        cause: String,
    },
    /// Error record for a terminal action that fell back to a rejection
    ResponseFailed {
        /// State the gate was finishing in
        state: GateState,
        /// Rendered error
        error: String,
    },
}

/// In-memory sink, mostly for tests.
///
/// # Examples
///
/// ```
/// use broker_gate::{GateLog, LogRecord, MemoryLog};
///
/// let log = MemoryLog::new();
/// log.checking_access("app.example.com", "alice", "/dash");
///
/// assert_eq!(
///     log.records(),
///     [LogRecord::CheckingAccess {
///         host: "app.example.com".into(),
///         user: "alice".into(),
///         uri: "/dash".into(),
///     }]
/// );
/// ```
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, record: LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Snapshot of all records, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of records captured.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GateLog for MemoryLog {
    fn checking_access(&self, host: &str, user: &str, uri: &str) {
        self.push(LogRecord::CheckingAccess {
            host: host.to_string(),
            user: user.to_string(),
            uri: uri.to_string(),
        });
    }

    fn credential_rejected(&self, host: &str, cause: &CredentialError) {
        self.push(LogRecord::CredentialRejected {
            host: host.to_string(),
            cause: cause.to_string(),
        });
    }

    fn response_failed(&self, state: GateState, error: &Error) {
        self.push(LogRecord::ResponseFailed {
            state,
            error: error.to_string(),
        });
    }
}
