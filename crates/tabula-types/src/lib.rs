//! Shared identifier and query types for Tabula.
//!
//! This crate is the vocabulary the session core speaks: opaque server
//! tokens, the plan-cache fingerprint, compiled-query records, and server
//! status codes. It has **no internal tabula dependencies**, a pure leaf
//! crate that the client builds on.
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`SessionId`]     | Server-assigned session token                |
//! | [`Endpoint`]      | Node the session was created on              |
//! | [`PlanId`]        | Server-assigned compiled plan id             |
//! | [`Fingerprint`]   | Plan-cache key derived from query text       |
//! | [`QueryKey`]      | Raw text or prepared handle, for lookups     |
//! | [`DataQuery`]     | Prepared query handle returned to callers    |
//! | [`CompiledQuery`] | Cached record: handle + plan id              |
//! | [`StatusCode`]    | Server verdict on an operation               |
//! |-------------------|----------------------------------------------|

pub mod ids;
pub mod query;
pub mod status;

pub use ids::{Endpoint, PlanId, SessionId};
pub use query::{CompiledQuery, DataQuery, Fingerprint, ParameterTypes, QueryKey};
pub use status::{Issue, StatusCode, format_issues};
