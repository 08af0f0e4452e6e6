//! Query fingerprints and compiled-query records.
//!
//! A [`Fingerprint`] is the plan-cache key. It is derived either from raw query
//! text or from a [`DataQuery`] handle the caller got back from an earlier
//! prepare; both routes land on the same key because a `DataQuery` stores the
//! fingerprint of its own text.
//!
//! ```text
//! QueryKey::Text("SELECT 1") ──sha256──┐
//!                                      ├──► Fingerprint("9f1c…") ──► PlanCache
//! QueryKey::Prepared(&DataQuery) ──────┘      (DataQuery::fingerprint)
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ids::PlanId;

/// Deterministic plan-cache key.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint raw query text: lowercase SHA-256 hex of the exact bytes.
    ///
    /// No normalization is applied. Two texts that differ only in whitespace
    /// are different queries to the server and get different plans.
    pub fn of_text(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Fingerprint either input form.
    pub fn of(key: QueryKey<'_>) -> Self {
        match key {
            QueryKey::Text(text) => Self::of_text(text),
            QueryKey::Prepared(query) => query.fingerprint.clone(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 16 hex chars is plenty to tell plans apart in logs
        let head = match self.0.char_indices().nth(16) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        };
        write!(f, "Fingerprint({head})")
    }
}

/// The two ways a caller can name a query.
#[derive(Clone, Copy, Debug)]
pub enum QueryKey<'a> {
    /// Raw query text.
    Text(&'a str),
    /// A handle returned by an earlier prepare.
    Prepared(&'a DataQuery),
}

impl<'a> QueryKey<'a> {
    /// The query text, whichever form the caller used.
    pub fn text(&self) -> &'a str {
        match self {
            QueryKey::Text(text) => text,
            QueryKey::Prepared(query) => &query.text,
        }
    }
}

impl<'a> From<&'a str> for QueryKey<'a> {
    fn from(text: &'a str) -> Self {
        QueryKey::Text(text)
    }
}

impl<'a> From<&'a String> for QueryKey<'a> {
    fn from(text: &'a String) -> Self {
        QueryKey::Text(text)
    }
}

impl<'a> From<&'a DataQuery> for QueryKey<'a> {
    fn from(query: &'a DataQuery) -> Self {
        QueryKey::Prepared(query)
    }
}

/// Declared parameter types of a prepared query, keyed by parameter name.
///
/// Type descriptors are opaque strings; converting values to them is the
/// value-marshaling layer's job.
pub type ParameterTypes = BTreeMap<String, String>;

/// Caller-facing handle for a prepared query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuery {
    pub text: String,
    /// Cache name; always `Fingerprint::of_text(&text)`.
    pub fingerprint: Fingerprint,
    pub parameter_types: ParameterTypes,
}

impl DataQuery {
    pub fn new(text: impl Into<String>, parameter_types: ParameterTypes) -> Self {
        let text = text.into();
        let fingerprint = Fingerprint::of_text(&text);
        Self {
            text,
            fingerprint,
            parameter_types,
        }
    }
}

/// What the plan cache stores: the query handle plus the server's plan id.
///
/// Immutable once built. The cache shares it behind an `Arc` and only ever
/// evicts or replaces whole records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub query: DataQuery,
    pub plan_id: PlanId,
}

impl CompiledQuery {
    pub fn new(query: DataQuery, plan_id: PlanId) -> Self {
        Self { query, plan_id }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.query.fingerprint
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_text_same_fingerprint() {
        assert_eq!(Fingerprint::of_text("SELECT 1;"), Fingerprint::of_text("SELECT 1;"));
    }

    #[test]
    fn test_distinct_text_distinct_fingerprint() {
        assert_ne!(Fingerprint::of_text("SELECT 1;"), Fingerprint::of_text("SELECT 2;"));
        assert_ne!(Fingerprint::of_text("SELECT 1;"), Fingerprint::of_text("SELECT  1;"));
    }

    #[test]
    fn test_known_digest() {
        // sha256("") is a fixed value
        assert_eq!(
            Fingerprint::of_text("").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_both_key_forms_agree() {
        let text = "DECLARE $id AS Uint64; SELECT * FROM t WHERE id = $id;";
        let query = DataQuery::new(text, ParameterTypes::from([("$id".into(), "Uint64".into())]));

        assert_eq!(
            Fingerprint::of(QueryKey::Text(text)),
            Fingerprint::of(QueryKey::Prepared(&query))
        );
        assert_eq!(QueryKey::from(&query).text(), text);
    }

    #[test]
    fn test_debug_truncates_on_char_boundary() {
        let digest = Fingerprint::of_text("SELECT 1;");
        assert_eq!(format!("{digest:?}"), format!("Fingerprint({})", &digest.as_str()[..16]));

        // names that arrive over the wire need not be hex
        let foreign: Fingerprint = serde_json::from_str("\"aééééééééééééé\"").unwrap();
        assert_eq!(format!("{foreign:?}"), "Fingerprint(aééééééééééééé)");
        let long: Fingerprint = serde_json::from_str("\"éééééééééééééééééééé\"").unwrap();
        assert_eq!(format!("{long:?}"), format!("Fingerprint({})", "é".repeat(16)));
    }

    #[test]
    fn test_prepared_handle_uses_its_cached_name() {
        // A handle whose name was assigned elsewhere is trusted as-is.
        let mut query = DataQuery::new("SELECT 1;", ParameterTypes::new());
        query.fingerprint = Fingerprint::of_text("renamed");
        assert_eq!(Fingerprint::of(QueryKey::Prepared(&query)), Fingerprint::of_text("renamed"));
    }
}
