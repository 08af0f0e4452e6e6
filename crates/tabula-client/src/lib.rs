//! Tabula session client library
//!
//! Manages the client side of a table-service session: the server-assigned
//! identity, endpoint affinity, single-flight use, a per-session cache of
//! compiled query plans, and deterministic recovery when the server
//! invalidates the session.
//!
//! The transport and the response classifier are collaborators supplied by
//! the caller through the [`Transport`] and [`ResponseClassifier`] traits.
//! Pooling, retries, and endpoint selection live above this crate: it is
//! handed one session at a time.

pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod plan_cache;
pub mod protocol;
pub mod recovery;
pub mod session;
pub mod state;

pub use config::{ConfigError, SessionConfig};
pub use dispatch::{
    ResponseClassifier, SessionScoped, StatusClassifier, Transport, Verdict, attach_request,
};
pub use error::{SessionError, TransportError};
pub use plan_cache::PlanCache;
pub use protocol::{
    AlterTableChanges, Column, DescribeTableSettings, ExecuteSettings, OperationStatus, QueryMeta,
    QueryRef, ReadTableOptions, Request, Response, ResponseResult, TableDescription, TableRequest,
};
pub use recovery::{recover_bad_session, recover_with};
pub use session::{ExplainResult, QueryResult, Session};
pub use state::{QueryPlanCache, SessionState};

pub use tabula_types::{
    CompiledQuery, DataQuery, Endpoint, Fingerprint, ParameterTypes, PlanId, QueryKey, SessionId,
    StatusCode,
};
