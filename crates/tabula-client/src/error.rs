//! Error types for session operations.

use std::time::Duration;

use tabula_types::{SessionId, StatusCode};
use thiserror::Error;

/// Failures reported by the transport collaborator.
///
/// Opaque to the session core: passed through to the caller unchanged and
/// never trigger a reset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("endpoint unavailable: {0}")]
    Unavailable(String),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("transport error: {0}")]
    Other(String),
}

/// Errors from session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The server no longer recognizes the session. The session state has
    /// already been reset by the time a caller sees this.
    #[error("bad session: {0}")]
    BadSession(String),

    /// An operation was started while another was still pending. The session
    /// state has already been reset.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Dispatch attempted before the session was bound. Nothing was sent.
    #[error("session is not bound")]
    InvalidSession,

    /// `create()` called on a session that already holds an identity.
    #[error("session already bound to {0}")]
    AlreadyBound(SessionId),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server rejected the operation for a session-independent reason.
    #[error("server returned {status}: {message}")]
    Server { status: StatusCode, message: String },

    /// The transport did not answer in time. The session state has been
    /// force-reset.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The response payload did not match the operation that was sent.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl SessionError {
    /// The classification that triggers automatic recovery.
    pub fn is_bad_session(&self) -> bool {
        matches!(self, SessionError::BadSession(_))
    }

    /// Server status behind this error, if the server produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SessionError::BadSession(_) => Some(StatusCode::BadSession),
            SessionError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when a caller may retry on a *new* session.
    ///
    /// Retrying after a transport error can reuse the same session; that is
    /// the caller's call and not reported here.
    pub fn needs_new_session(&self) -> bool {
        matches!(
            self,
            SessionError::BadSession(_)
                | SessionError::ProtocolViolation(_)
                | SessionError::Timeout(_)
        )
    }
}
