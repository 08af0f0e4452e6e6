//! Scripted transport shared by the integration tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tabula_client::{
    Endpoint, OperationStatus, ParameterTypes, PlanId, Request, Response, ResponseResult, Session,
    SessionConfig, SessionId, StatusCode, Transport, TransportError,
};

/// One scripted reaction to a dispatched request.
pub enum Step {
    Reply(Response),
    Fail(TransportError),
    /// Never answer.
    Hang,
}

/// Replays a fixed script of replies and records every request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<(Option<Endpoint>, Request)>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, step: Step) {
        self.script.lock().push_back(step);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_request(&self) -> Request {
        self.calls.lock().last().expect("no requests dispatched").1.clone()
    }

    pub fn last_endpoint(&self) -> Option<Endpoint> {
        self.calls.lock().last().expect("no requests dispatched").0.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn dispatch(
        &self,
        endpoint: Option<&Endpoint>,
        request: Request,
    ) -> Result<Response, TransportError> {
        self.calls.lock().push((endpoint.cloned(), request));
        let step = self.script.lock().pop_front();
        match step {
            Some(Step::Reply(response)) => Ok(response),
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(TransportError::Other("script exhausted".into())),
        }
    }
}

// ── Canned responses ────────────────────────────────────────────────────────

pub const ENDPOINT: &str = "node-1:2135";

pub fn created(id: &str) -> Step {
    Step::Reply(
        Response::success(ResponseResult::CreateSession {
            session_id: SessionId::new(id),
        })
        .with_endpoint(Endpoint::new(ENDPOINT)),
    )
}

pub fn prepared(plan: &str) -> Step {
    Step::Reply(Response::success(ResponseResult::PrepareQuery {
        plan_id: PlanId::new(plan),
        parameter_types: ParameterTypes::from([("$id".to_string(), "Uint64".to_string())]),
    }))
}

pub fn rows(n: usize) -> Step {
    Step::Reply(Response::success(ResponseResult::ExecuteQuery {
        result_sets: (0..n).map(|i| serde_json::json!({ "row": i })).collect(),
        query_meta: None,
    }))
}

pub fn ok() -> Step {
    Step::Reply(Response::success(ResponseResult::Empty))
}

pub fn operation(id: &str, ready: bool) -> Step {
    Step::Reply(Response::success(ResponseResult::Operation {
        operation: OperationStatus {
            id: id.to_string(),
            ready,
        },
    }))
}

pub fn failed(status: StatusCode, message: &str) -> Step {
    Step::Reply(Response::failure(status, message))
}

/// A session already bound to `S1` via a scripted create.
pub async fn bound_session(
    config: &SessionConfig,
    steps: impl IntoIterator<Item = Step>,
) -> (Session<Arc<ScriptedTransport>>, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new([created("S1")]);
    for step in steps {
        transport.push(step);
    }
    let mut session = Session::new(transport.clone(), config);
    session.create().await.expect("scripted create");
    (session, transport)
}
