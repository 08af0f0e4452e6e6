//! The boundary between the session core and its collaborators.
//!
//! - [`attach_request`] stamps the session id onto an outgoing request and
//!   refuses to let an unbound session anywhere near the network.
//! - [`Transport`] sends a request and returns the raw response.
//! - [`ResponseClassifier`] turns a raw response into a [`Verdict`], the only
//!   input that can trigger bad-session recovery.

use async_trait::async_trait;
use tabula_types::{Endpoint, SessionId, StatusCode, format_issues};

use crate::error::{SessionError, TransportError};
use crate::protocol::{Request, Response};
use crate::state::SessionState;

// ============================================================================
// Request Dispatch Guard
// ============================================================================

/// A request that carries a session id field.
pub trait SessionScoped {
    fn set_session_id(&mut self, session_id: SessionId);
}

impl SessionScoped for Request {
    fn set_session_id(&mut self, session_id: SessionId) {
        self.session_id = Some(session_id);
    }
}

/// Stamp `request` with the bound session id.
///
/// Fails with [`SessionError::InvalidSession`] when the session is unbound;
/// the request is dropped and nothing is sent.
pub fn attach_request<R: SessionScoped>(
    state: &SessionState,
    mut request: R,
) -> Result<R, SessionError> {
    let session_id = state.require_bound()?;
    request.set_session_id(session_id.clone());
    Ok(request)
}

// ============================================================================
// Transport
// ============================================================================

/// Sends requests to the server.
///
/// `endpoint` is the session's affinity hint: `None` before the session is
/// created (the transport picks a node and reports it back in
/// [`Response::endpoint`]), `Some` afterwards.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(
        &self,
        endpoint: Option<&Endpoint>,
        request: Request,
    ) -> Result<Response, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn dispatch(
        &self,
        endpoint: Option<&Endpoint>,
        request: Request,
    ) -> Result<Response, TransportError> {
        (**self).dispatch(endpoint, request).await
    }
}

// ============================================================================
// Response Classifier
// ============================================================================

/// The collaborator's verdict on a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Success,
    /// The server no longer knows this session.
    BadSession(String),
    OtherFailure { status: StatusCode, detail: String },
}

impl Verdict {
    /// Convert into the error the session operations propagate.
    pub fn into_result(self) -> Result<(), SessionError> {
        match self {
            Verdict::Success => Ok(()),
            Verdict::BadSession(detail) => Err(SessionError::BadSession(detail)),
            Verdict::OtherFailure { status, detail } => Err(SessionError::Server {
                status,
                message: detail,
            }),
        }
    }
}

/// Labels raw responses.
pub trait ResponseClassifier: Send + Sync {
    fn classify(&self, response: &Response) -> Verdict;
}

/// Classifies by status code alone.
///
/// `BAD_SESSION` and `SESSION_EXPIRED` are bad sessions; `SUCCESS` is success;
/// everything else is some other failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusClassifier;

impl ResponseClassifier for StatusClassifier {
    fn classify(&self, response: &Response) -> Verdict {
        let detail = || {
            if response.issues.is_empty() {
                response.status.to_string()
            } else {
                format_issues(&response.issues)
            }
        };
        match response.status {
            status if status.is_success() => Verdict::Success,
            status if status.invalidates_session() => Verdict::BadSession(detail()),
            status => Verdict::OtherFailure {
                status,
                detail: detail(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ResponseResult, TableRequest};

    #[test]
    fn test_attach_stamps_bound_id() {
        let mut state = SessionState::default();
        state.bind(SessionId::new("S1"), Endpoint::new("node-1:2135"));

        let request = attach_request(&state, Request::new(TableRequest::KeepAlive)).unwrap();

        assert_eq!(request.session_id, Some(SessionId::new("S1")));
    }

    #[test]
    fn test_attach_rejects_unbound() {
        let state = SessionState::default();
        let err = attach_request(&state, Request::new(TableRequest::KeepAlive)).unwrap_err();
        assert!(matches!(err, SessionError::InvalidSession));
    }

    #[test]
    fn test_attach_leaves_state_alone() {
        let mut state = SessionState::default();
        state.bind(SessionId::new("S1"), Endpoint::new("node-1:2135"));
        attach_request(&state, Request::new(TableRequest::KeepAlive)).unwrap();
        assert!(!state.is_pending());
    }

    #[test]
    fn test_status_classifier() {
        let c = StatusClassifier;
        assert_eq!(c.classify(&Response::success(ResponseResult::Empty)), Verdict::Success);
        assert_eq!(
            c.classify(&Response::failure(StatusCode::BadSession, "Session not found")),
            Verdict::BadSession("Session not found".into())
        );
        assert!(matches!(
            c.classify(&Response::failure(StatusCode::SessionExpired, "expired")),
            Verdict::BadSession(_)
        ));
        assert_eq!(
            c.classify(&Response::failure(StatusCode::Overloaded, "too many requests")),
            Verdict::OtherFailure {
                status: StatusCode::Overloaded,
                detail: "too many requests".into()
            }
        );
    }

    #[test]
    fn test_classifier_falls_back_to_status_name() {
        let mut response = Response::failure(StatusCode::Unavailable, "x");
        response.issues.clear();
        assert_eq!(
            StatusClassifier.classify(&response),
            Verdict::OtherFailure {
                status: StatusCode::Unavailable,
                detail: "UNAVAILABLE".into()
            }
        );
    }

    #[test]
    fn test_verdict_into_result() {
        assert!(Verdict::Success.into_result().is_ok());
        assert!(Verdict::BadSession("x".into()).into_result().unwrap_err().is_bad_session());
        let err = Verdict::OtherFailure {
            status: StatusCode::NotFound,
            detail: "plan".into(),
        }
        .into_result()
        .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::NotFound));
    }
}
