//! Server status codes and issue messages.
//!
//! Every table-service response carries one [`StatusCode`] plus a list of
//! [`Issue`]s. The client only branches on a handful of codes; the rest are
//! carried through to the caller untouched.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Operation status reported by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum StatusCode {
    Success,
    BadRequest,
    Unauthorized,
    InternalError,
    Aborted,
    Unavailable,
    Overloaded,
    SchemeError,
    GenericError,
    Timeout,
    /// The session token is unknown to the server.
    BadSession,
    PreconditionFailed,
    AlreadyExists,
    NotFound,
    /// The session existed but the server has since dropped it.
    SessionExpired,
    Cancelled,
    Undetermined,
    Unsupported,
    SessionBusy,
}

impl StatusCode {
    /// True when the server no longer recognizes the session token.
    ///
    /// Only these codes mean server-side state the client still references is
    /// gone; every other failure leaves the session usable.
    pub fn invalidates_session(self) -> bool {
        matches!(self, StatusCode::BadSession | StatusCode::SessionExpired)
    }

    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }
}

/// One diagnostic message attached to a response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub message: String,
    #[serde(default)]
    pub issue_code: u32,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl Issue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            issue_code: 0,
            issues: Vec::new(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for nested in &self.issues {
            write!(f, " ({nested})")?;
        }
        Ok(())
    }
}

/// Join a list of issues into a single log-friendly line.
pub fn format_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
