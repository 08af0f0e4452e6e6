//! Logical request and response shapes exchanged with the transport.
//!
//! These are *not* wire schemas. The transport owns encoding; the session core
//! only fills in the fields it is responsible for (the session id, the query
//! reference) and reads back the fields it needs (status, new session id,
//! plan id, parameter types). Row data, table descriptions, and parameter
//! values stay as opaque JSON because value conversion lives elsewhere.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tabula_types::{Endpoint, Issue, ParameterTypes, PlanId, SessionId, StatusCode};

// ============================================================================
// Requests
// ============================================================================

/// An outgoing request: a body plus the session id stamped by
/// [`attach_request`](crate::dispatch::attach_request).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub session_id: Option<SessionId>,
    pub body: TableRequest,
}

impl Request {
    /// A request with no session id yet.
    pub fn new(body: TableRequest) -> Self {
        Self { session_id: None, body }
    }

    /// Short operation name for spans and logs.
    pub fn operation(&self) -> &'static str {
        self.body.operation()
    }
}

/// How an execute request names its query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryRef {
    /// Full text; the server compiles it.
    Text(String),
    /// A plan the server compiled earlier in this session.
    Plan(PlanId),
}

/// Optional flags for `describe_table`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeTableSettings {
    pub include_shard_key_bounds: bool,
    pub include_table_stats: bool,
}

/// Optional flags for `execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSettings {
    /// Ask the server to keep the compiled plan and report its id back.
    pub keep_in_cache: bool,
}

impl Default for ExecuteSettings {
    fn default() -> Self {
        Self {
            keep_in_cache: crate::constants::DEFAULT_KEEP_IN_SERVER_CACHE,
        }
    }
}

/// A column declaration: name plus opaque type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub type_name: String,
}

impl Column {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Table definition for `create_table`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescription {
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl TableDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key.push(key.into());
        self
    }
}

/// Schema changes for `alter_table`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterTableChanges {
    pub add_columns: Vec<Column>,
    pub drop_columns: Vec<String>,
    pub alter_attributes: BTreeMap<String, String>,
}

/// Options for `read_table`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadTableOptions {
    /// Empty means all columns.
    pub columns: Vec<String>,
    pub ordered: bool,
    pub row_limit: Option<u64>,
    pub use_snapshot: Option<bool>,
}

/// Table-service operations the session core knows how to drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TableRequest {
    CreateSession,
    DeleteSession,
    KeepAlive,
    PrepareDataQuery {
        text: String,
    },
    ExecuteDataQuery {
        query: QueryRef,
        parameters: BTreeMap<String, JsonValue>,
        keep_in_cache: bool,
    },
    ExecuteSchemeQuery {
        text: String,
    },
    ExplainDataQuery {
        text: String,
    },
    DescribeTable {
        path: String,
        settings: DescribeTableSettings,
    },
    CreateTable {
        path: String,
        description: TableDescription,
    },
    AlterTable {
        path: String,
        changes: AlterTableChanges,
    },
    CopyTables {
        /// `(source, destination)` pairs.
        tables: Vec<(String, String)>,
    },
    ReadTable {
        path: String,
        options: ReadTableOptions,
    },
}

impl TableRequest {
    pub fn operation(&self) -> &'static str {
        match self {
            TableRequest::CreateSession => "create_session",
            TableRequest::DeleteSession => "delete_session",
            TableRequest::KeepAlive => "keep_alive",
            TableRequest::PrepareDataQuery { .. } => "prepare_data_query",
            TableRequest::ExecuteDataQuery { .. } => "execute_data_query",
            TableRequest::ExecuteSchemeQuery { .. } => "execute_scheme_query",
            TableRequest::ExplainDataQuery { .. } => "explain_data_query",
            TableRequest::DescribeTable { .. } => "describe_table",
            TableRequest::CreateTable { .. } => "create_table",
            TableRequest::AlterTable { .. } => "alter_table",
            TableRequest::CopyTables { .. } => "copy_tables",
            TableRequest::ReadTable { .. } => "read_table",
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// A response as handed back by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: StatusCode,
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// The endpoint that served the request, as reported by the transport.
    pub endpoint: Option<Endpoint>,
    pub result: ResponseResult,
}

impl Response {
    /// A successful response with the given payload.
    pub fn success(result: ResponseResult) -> Self {
        Self {
            status: StatusCode::Success,
            issues: Vec::new(),
            endpoint: None,
            result,
        }
    }

    /// A failed response carrying one issue message.
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            issues: vec![Issue::new(message)],
            endpoint: None,
            result: ResponseResult::Empty,
        }
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

/// Server-side metadata for a query compiled during execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryMeta {
    pub plan_id: PlanId,
    pub parameter_types: ParameterTypes,
}

/// Handle for a schema operation the server may still be running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatus {
    /// Server-assigned operation id; empty for operations finished inline.
    #[serde(default)]
    pub id: String,
    /// False while a long-running change is still being applied.
    pub ready: bool,
}

/// Operation-specific response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseResult {
    Empty,
    CreateSession {
        session_id: SessionId,
    },
    PrepareQuery {
        plan_id: PlanId,
        parameter_types: ParameterTypes,
    },
    ExecuteQuery {
        result_sets: Vec<JsonValue>,
        query_meta: Option<QueryMeta>,
    },
    Explain {
        query_ast: String,
        query_plan: String,
    },
    DescribeTable {
        description: JsonValue,
    },
    ReadTable {
        result_set: JsonValue,
    },
    Operation {
        operation: OperationStatus,
    },
}

impl ResponseResult {
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseResult::Empty => "empty",
            ResponseResult::CreateSession { .. } => "create_session",
            ResponseResult::PrepareQuery { .. } => "prepare_query",
            ResponseResult::ExecuteQuery { .. } => "execute_query",
            ResponseResult::Explain { .. } => "explain",
            ResponseResult::DescribeTable { .. } => "describe_table",
            ResponseResult::ReadTable { .. } => "read_table",
            ResponseResult::Operation { .. } => "operation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_starts_unstamped() {
        let request = Request::new(TableRequest::KeepAlive);
        assert!(request.session_id.is_none());
        assert_eq!(request.operation(), "keep_alive");
    }

    #[test]
    fn test_failure_response_carries_issue() {
        let response = Response::failure(StatusCode::BadSession, "Session not found");
        assert_eq!(response.status, StatusCode::BadSession);
        assert_eq!(response.issues[0].message, "Session not found");
        assert_eq!(response.result.kind(), "empty");
    }

    #[test]
    fn test_request_json_shape() {
        let request = Request::new(TableRequest::ExecuteDataQuery {
            query: QueryRef::Plan(PlanId::new("p1")),
            parameters: BTreeMap::new(),
            keep_in_cache: true,
        });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["body"]["op"], "execute_data_query");
        assert_eq!(json["body"]["query"]["plan"], "p1");
    }

    #[test]
    fn test_operation_payload_json_shape() {
        let json = serde_json::json!({
            "kind": "operation",
            "operation": { "id": "op-7", "ready": false },
        });
        let result: ResponseResult = serde_json::from_value(json).unwrap();
        assert_eq!(
            result,
            ResponseResult::Operation {
                operation: OperationStatus {
                    id: "op-7".into(),
                    ready: false,
                },
            }
        );
        assert_eq!(result.kind(), "operation");
    }
}
