//! Typed identifiers for sessions, endpoints, and compiled query plans.
//!
//! All three wrap opaque strings handed out by the server (or, for endpoints,
//! by the connection layer). The client never parses them; it only stores,
//! compares, and stamps them onto outgoing requests. The `short()` form is for
//! log lines only and is never used as a lookup key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A server-assigned session token.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

/// The network endpoint a session was created on.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

/// A server-assigned compiled plan identifier.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

// ── Shared behavior ─────────────────────────────────────────────────────────

/// Characters kept by `short()`.
const SHORT_LEN: usize = 12;

macro_rules! impl_opaque_token {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Wrap a raw token.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// The raw token as sent on the wire.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Leading characters of the token, for human display only.
            pub fn short(&self) -> &str {
                match self.0.char_indices().nth(SHORT_LEN) {
                    Some((idx, _)) => &self.0[..idx],
                    None => &self.0,
                }
            }

            /// True for an empty token, which the server never issues.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_opaque_token!(SessionId, "SessionId");
impl_opaque_token!(Endpoint, "Endpoint");
impl_opaque_token!(PlanId, "PlanId");

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_truncates_long_tokens() {
        let id = SessionId::new("ydb://session/3?node_id=42&id=abcdef");
        assert_eq!(id.short(), "ydb://sessio");
        assert_eq!(id.as_str(), "ydb://session/3?node_id=42&id=abcdef");
    }

    #[test]
    fn test_short_keeps_short_tokens() {
        let ep = Endpoint::new("node-1:2135");
        assert_eq!(ep.short(), "node-1:2135");
    }

    #[test]
    fn test_short_respects_char_boundaries() {
        let id = PlanId::new("ééééééééééééééé");
        assert_eq!(id.short().chars().count(), SHORT_LEN);
    }

    #[test]
    fn test_debug_names_the_type() {
        let id = SessionId::from("S1");
        assert_eq!(format!("{id:?}"), "SessionId(S1)");
        assert_eq!(id.to_string(), "S1");
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = SessionId::from("S1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"S1\"");
    }
}
