//! Session configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! client_cache_enabled = true
//! plan_cache_capacity = 1000
//! operation_timeout_ms = 5000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_CLIENT_CACHE_ENABLED, DEFAULT_PLAN_CACHE_CAPACITY};

/// Errors loading a [`SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cache compiled plans client-side. When false, lookups always miss and
    /// puts are dropped.
    pub client_cache_enabled: bool,
    /// Maximum number of plans kept per session.
    pub plan_cache_capacity: usize,
    /// Upper bound on a single transport round-trip. Expiry force-resets the
    /// session. Zero is treated as one millisecond.
    pub operation_timeout_ms: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_cache_enabled: DEFAULT_CLIENT_CACHE_ENABLED,
            plan_cache_capacity: DEFAULT_PLAN_CACHE_CAPACITY,
            operation_timeout_ms: None,
        }
    }
}

impl SessionConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(|ms| Duration::from_millis(ms.max(1)))
    }

    pub fn with_client_cache(mut self, enabled: bool) -> Self {
        self.client_cache_enabled = enabled;
        self
    }

    pub fn with_plan_cache_capacity(mut self, capacity: usize) -> Self {
        self.plan_cache_capacity = capacity;
        self
    }

    /// Set the round-trip bound, rounded up to whole milliseconds.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        let ms = timeout.as_nanos().div_ceil(1_000_000);
        self.operation_timeout_ms = Some(u64::try_from(ms).unwrap_or(u64::MAX));
        self
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = SessionConfig::from_toml_str("").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert!(config.client_cache_enabled);
        assert_eq!(config.plan_cache_capacity, 1000);
        assert_eq!(config.operation_timeout(), None);
    }

    #[test]
    fn test_partial_override() {
        let config = SessionConfig::from_toml_str(
            "client_cache_enabled = false\noperation_timeout_ms = 250\n",
        )
        .unwrap();
        assert!(!config.client_cache_enabled);
        assert_eq!(config.plan_cache_capacity, 1000);
        assert_eq!(config.operation_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_operation_timeout_rounds_up_to_millis() {
        let config = SessionConfig::default().with_operation_timeout(Duration::from_micros(500));
        assert_eq!(config.operation_timeout(), Some(Duration::from_millis(1)));

        let config = SessionConfig::default().with_operation_timeout(Duration::from_micros(2001));
        assert_eq!(config.operation_timeout(), Some(Duration::from_millis(3)));

        let config = SessionConfig::default().with_operation_timeout(Duration::from_secs(2));
        assert_eq!(config.operation_timeout_ms, Some(2000));
    }

    #[test]
    fn test_zero_timeout_is_never_instant() {
        let config = SessionConfig::from_toml_str("operation_timeout_ms = 0").unwrap();
        assert_eq!(config.operation_timeout(), Some(Duration::from_millis(1)));

        let config = SessionConfig::default().with_operation_timeout(Duration::ZERO);
        assert_eq!(config.operation_timeout(), Some(Duration::from_millis(1)));
    }

    #[test]
    fn test_rejects_wrong_types() {
        let err = SessionConfig::from_toml_str("plan_cache_capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "plan_cache_capacity = 16").unwrap();

        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.plan_cache_capacity, 16);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SessionConfig::load("/nonexistent/tabula.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
