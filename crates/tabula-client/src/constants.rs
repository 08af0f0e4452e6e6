//! Client configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

/// Plan cache capacity per session when the config does not override it.
pub const DEFAULT_PLAN_CACHE_CAPACITY: usize = 1000;

/// Whether compiled plans are cached client-side by default.
pub const DEFAULT_CLIENT_CACHE_ENABLED: bool = true;

/// Ask the server to keep plans for data queries executed by text.
pub const DEFAULT_KEEP_IN_SERVER_CACHE: bool = true;
