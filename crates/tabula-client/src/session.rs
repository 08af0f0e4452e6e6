//! Table-service session: the operations that drive [`SessionState`] end to
//! end over a [`Transport`].
//!
//! Every operation follows the same path:
//!
//! ```text
//!   require bound ──▶ start_operation (query-bearing ops only)
//!        │
//!        ▼
//!   attach_request ──▶ Transport::dispatch ──▶ ResponseClassifier
//!                          (may time out)             │
//!                                                     ▼
//!                               recover_bad_session(complete_operation,
//!                                                   interpret payload,
//!                                                   update plan cache)
//! ```
//!
//! Operations take `&mut self`, so one `Session` can never have two
//! operations in flight at once. If a caller drops an operation future
//! mid-flight, the pending flag stays set and the next query-bearing call
//! resets the session instead of trusting it. Callers running their own
//! timeout around an operation should call [`Session::force_reset`] once
//! the abandoned future is dropped.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tabula_types::{CompiledQuery, DataQuery, Endpoint, QueryKey, SessionId, StatusCode};
use tracing::{Instrument, debug, info, info_span};

use crate::config::SessionConfig;
use crate::dispatch::{ResponseClassifier, StatusClassifier, Transport, attach_request};
use crate::error::SessionError;
use crate::protocol::{
    AlterTableChanges, DescribeTableSettings, ExecuteSettings, OperationStatus, QueryRef,
    ReadTableOptions, Request, Response, ResponseResult, TableDescription, TableRequest,
};
use crate::recovery::recover_bad_session;
use crate::state::SessionState;

/// Rows returned by `execute`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub result_sets: Vec<JsonValue>,
    /// True when the request named a cached plan instead of sending text.
    pub from_cache: bool,
}

/// Output of `explain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainResult {
    pub query_ast: String,
    pub query_plan: String,
}

/// A single server session and the transport it talks through.
pub struct Session<T, C = StatusClassifier> {
    state: SessionState,
    transport: T,
    classifier: C,
    operation_timeout: Option<Duration>,
}

impl<T: Transport> Session<T> {
    /// Unbound session using the status-code classifier.
    pub fn new(transport: T, config: &SessionConfig) -> Self {
        Self::with_classifier(transport, StatusClassifier, config)
    }
}

impl<T: Transport, C: ResponseClassifier> Session<T, C> {
    pub fn with_classifier(transport: T, classifier: C, config: &SessionConfig) -> Self {
        Self {
            state: SessionState::new(config),
            transport,
            classifier,
            operation_timeout: config.operation_timeout(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Direct access for owners that manage identity themselves.
    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.state.session_id()
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.state.endpoint()
    }

    /// Forget the server session locally without telling the server.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Reset after an abandoned or timed-out operation.
    pub fn force_reset(&mut self, reason: &str) {
        self.state.force_reset(reason);
    }

    // ── Session lifecycle ────────────────────────────────────────────────

    /// Ask the server for a new session and bind to it.
    pub async fn create(&mut self) -> Result<SessionId, SessionError> {
        if let Some(id) = self.state.session_id() {
            return Err(SessionError::AlreadyBound(id.clone()));
        }
        let span = self.span("create_session");
        async move {
            let response = self.send(Request::new(TableRequest::CreateSession)).await?;
            let classifier = &self.classifier;
            recover_bad_session(&mut self.state, |state| {
                classifier.classify(&response).into_result()?;
                let session_id = match response.result {
                    ResponseResult::CreateSession { session_id } => session_id,
                    other => return Err(unexpected("create_session", &other)),
                };
                if session_id.is_empty() {
                    return Err(SessionError::UnexpectedResponse(
                        "server issued an empty session id".into(),
                    ));
                }
                let endpoint = response.endpoint.ok_or_else(|| {
                    SessionError::UnexpectedResponse("transport did not report an endpoint".into())
                })?;
                state.bind(session_id.clone(), endpoint);
                Ok(session_id)
            })
        }
        .instrument(span)
        .await
    }

    /// Delete the session on the server, then reset locally.
    pub async fn delete(&mut self) -> Result<(), SessionError> {
        self.run(TableRequest::DeleteSession, false, |state, _| {
            state.reset();
            Ok(())
        })
        .await
    }

    /// Keep the server session from idling out.
    pub async fn keep_alive(&mut self) -> Result<(), SessionError> {
        self.run(TableRequest::KeepAlive, false, |_, _| Ok(())).await
    }

    // ── Data queries ─────────────────────────────────────────────────────

    /// Compile `text` on the server and cache the plan.
    ///
    /// A query already in the plan cache is returned without a round-trip.
    pub async fn prepare(&mut self, text: &str) -> Result<DataQuery, SessionError> {
        if let Some(cached) = self.state.cache_lookup(text) {
            debug!("Prepare served from plan cache: {:?}", cached.fingerprint());
            return Ok(cached.query.clone());
        }
        let body = TableRequest::PrepareDataQuery {
            text: text.to_string(),
        };
        self.run(body, true, |state, result| match result {
            ResponseResult::PrepareQuery {
                plan_id,
                parameter_types,
            } => {
                let query = DataQuery::new(text, parameter_types);
                state.cache_put(&query, CompiledQuery::new(query.clone(), plan_id));
                Ok(query)
            }
            other => Err(unexpected("prepare_data_query", &other)),
        })
        .await
    }

    /// Execute a data query by text or by prepared handle.
    ///
    /// A cached plan is referenced by id; otherwise the text is sent and any
    /// plan the server reports back is cached. If the server no longer has a
    /// cached plan (`NOT_FOUND`), that plan is evicted before the error is
    /// returned so the next attempt sends text.
    pub async fn execute<'q>(
        &mut self,
        query: impl Into<QueryKey<'q>>,
        parameters: BTreeMap<String, JsonValue>,
        settings: ExecuteSettings,
    ) -> Result<QueryResult, SessionError> {
        let key = query.into();
        let span = self.span("execute_data_query");
        async move {
            let cached = self.state.cache_lookup(key);
            let query_ref = match &cached {
                Some(record) => QueryRef::Plan(record.plan_id.clone()),
                None => QueryRef::Text(key.text().to_string()),
            };
            let request = self.begin_query(TableRequest::ExecuteDataQuery {
                query: query_ref,
                parameters,
                keep_in_cache: settings.keep_in_cache,
            })?;
            let response = self.send(request).await;

            let classifier = &self.classifier;
            recover_bad_session(&mut self.state, |state| {
                state.complete_operation();
                let response = response?;
                if let Err(err) = classifier.classify(&response).into_result() {
                    if cached.is_some() && err.status() == Some(StatusCode::NotFound) {
                        debug!("Server dropped cached plan, evicting");
                        state.cache_evict(key);
                    }
                    return Err(err);
                }
                match response.result {
                    ResponseResult::ExecuteQuery {
                        result_sets,
                        query_meta,
                    } => {
                        if let (None, Some(meta)) = (&cached, query_meta) {
                            let compiled = DataQuery::new(key.text(), meta.parameter_types);
                            state.cache_put(key, CompiledQuery::new(compiled, meta.plan_id));
                        }
                        Ok(QueryResult {
                            result_sets,
                            from_cache: cached.is_some(),
                        })
                    }
                    other => Err(unexpected("execute_data_query", &other)),
                }
            })
        }
        .instrument(span)
        .await
    }

    /// Run a schema (DDL) query.
    pub async fn execute_scheme(&mut self, text: &str) -> Result<(), SessionError> {
        let body = TableRequest::ExecuteSchemeQuery {
            text: text.to_string(),
        };
        self.run(body, true, |_, _| Ok(())).await
    }

    /// Ask the server for the AST and plan of a data query.
    pub async fn explain(&mut self, text: &str) -> Result<ExplainResult, SessionError> {
        let body = TableRequest::ExplainDataQuery {
            text: text.to_string(),
        };
        self.run(body, true, |_, result| match result {
            ResponseResult::Explain {
                query_ast,
                query_plan,
            } => Ok(ExplainResult {
                query_ast,
                query_plan,
            }),
            other => Err(unexpected("explain_data_query", &other)),
        })
        .await
    }

    // ── Table operations ─────────────────────────────────────────────────

    pub async fn describe_table(
        &mut self,
        path: &str,
        settings: DescribeTableSettings,
    ) -> Result<JsonValue, SessionError> {
        let body = TableRequest::DescribeTable {
            path: path.to_string(),
            settings,
        };
        self.run(body, false, |_, result| match result {
            ResponseResult::DescribeTable { description } => Ok(description),
            other => Err(unexpected("describe_table", &other)),
        })
        .await
    }

    // Schema operations hand back the server's operation handle; a change
    // that is still being applied comes back with `ready == false`.

    pub async fn create_table(
        &mut self,
        path: &str,
        description: TableDescription,
    ) -> Result<OperationStatus, SessionError> {
        let body = TableRequest::CreateTable {
            path: path.to_string(),
            description,
        };
        self.run(body, false, |_, result| operation("create_table", result)).await
    }

    pub async fn alter_table(
        &mut self,
        path: &str,
        changes: AlterTableChanges,
    ) -> Result<OperationStatus, SessionError> {
        let body = TableRequest::AlterTable {
            path: path.to_string(),
            changes,
        };
        self.run(body, false, |_, result| operation("alter_table", result)).await
    }

    /// Copy tables, given `(source, destination)` path pairs.
    pub async fn copy_tables(
        &mut self,
        tables: Vec<(String, String)>,
    ) -> Result<OperationStatus, SessionError> {
        self.run(TableRequest::CopyTables { tables }, false, |_, result| {
            operation("copy_tables", result)
        })
        .await
    }

    pub async fn read_table(
        &mut self,
        path: &str,
        options: ReadTableOptions,
    ) -> Result<JsonValue, SessionError> {
        let body = TableRequest::ReadTable {
            path: path.to_string(),
            options,
        };
        self.run(body, false, |_, result| match result {
            ResponseResult::ReadTable { result_set } => Ok(result_set),
            other => Err(unexpected("read_table", &other)),
        })
        .await
    }

    // ── Plumbing ─────────────────────────────────────────────────────────

    fn span(&self, op: &'static str) -> tracing::Span {
        info_span!(
            "session",
            op,
            session_id = self.state.session_id().map(SessionId::short).unwrap_or("unbound")
        )
    }

    /// Stamp, then mark in flight. Stamping first keeps an unbound session
    /// from ever entering the pending state.
    fn begin_query(&mut self, body: TableRequest) -> Result<Request, SessionError> {
        let request = attach_request(&self.state, Request::new(body))?;
        self.state.start_operation()?;
        Ok(request)
    }

    /// Dispatch on the session's endpoint, bounded by the operation timeout.
    async fn send(&mut self, request: Request) -> Result<Response, SessionError> {
        let op = request.operation();
        let endpoint = self.state.endpoint().cloned();
        let call = self.transport.dispatch(endpoint.as_ref(), request);
        let response = match self.operation_timeout {
            None => call.await?,
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result?,
                Err(_) => {
                    self.state.force_reset(&format!("{op} exceeded {limit:?}"));
                    return Err(SessionError::Timeout(limit));
                }
            },
        };
        debug!("{} returned {}", op, response.status);
        Ok(response)
    }

    /// Shared path for every bound operation.
    async fn run<R, F>(
        &mut self,
        body: TableRequest,
        single_flight: bool,
        interpret: F,
    ) -> Result<R, SessionError>
    where
        F: FnOnce(&mut SessionState, ResponseResult) -> Result<R, SessionError>,
    {
        let span = self.span(body.operation());
        async move {
            let request = if single_flight {
                self.begin_query(body)?
            } else {
                attach_request(&self.state, Request::new(body))?
            };
            let response = self.send(request).await;

            let classifier = &self.classifier;
            let result = recover_bad_session(&mut self.state, |state| {
                if single_flight {
                    state.complete_operation();
                }
                let response = response?;
                classifier.classify(&response).into_result()?;
                interpret(state, response.result)
            });
            if let Err(err) = &result {
                info!("Operation failed: {}", err);
            }
            result
        }
        .instrument(span)
        .await
    }
}

fn unexpected(op: &str, got: &ResponseResult) -> SessionError {
    SessionError::UnexpectedResponse(format!("{op} answered with a {} payload", got.kind()))
}

fn operation(op: &str, result: ResponseResult) -> Result<OperationStatus, SessionError> {
    match result {
        ResponseResult::Operation { operation } => Ok(operation),
        other => Err(unexpected(op, &other)),
    }
}

// ============================================================================
// Tests
// ============================================================================
