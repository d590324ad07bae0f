//! Test doubles for the coordinator's collaborators

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use http::Method;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::active_requests::Http2Context;
use crate::authorization::{AuthorizationProxy, AuthorizationRequest, AuthorizationResponse};
use crate::error::{ExecutionResult, Result, ServerError};
use crate::executor::AsyncExecutor;
use crate::http::HttpResponse;
use crate::metrics::MetricClient;

/// Runs every task to completion on the scheduling thread
///
/// Tasks must not wait on anything that is not already ready.
pub struct InlineExecutor;

impl AsyncExecutor for InlineExecutor {
    fn schedule(&self, task: BoxFuture<'static, ()>) -> ExecutionResult {
        match task.now_or_never() {
            Some(()) => Ok(()),
            None => Err(ServerError::ExecutorUnavailable("inline task did not complete".to_string())),
        }
    }
}

/// Refuses every task
pub struct RejectingExecutor;

impl AsyncExecutor for RejectingExecutor {
    fn schedule(&self, _task: BoxFuture<'static, ()>) -> ExecutionResult {
        Err(ServerError::ExecutorUnavailable("rejecting".to_string()))
    }
}

/// Queues tasks so a test can step through them in submission order
#[derive(Default)]
pub struct ManualExecutor {
    queue: Mutex<VecDeque<BoxFuture<'static, ()>>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Run the oldest queued task; false when the queue is empty
    pub fn run_next(&self) -> bool {
        // Release the lock first, the task may schedule more work
        let task = self.queue.lock().unwrap().pop_front();
        match task {
            Some(task) => {
                futures::executor::block_on(task);
                true
            }
            None => false,
        }
    }

    pub fn run_all(&self) {
        while self.run_next() {}
    }
}

impl AsyncExecutor for ManualExecutor {
    fn schedule(&self, task: BoxFuture<'static, ()>) -> ExecutionResult {
        self.queue.lock().unwrap().push_back(task);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum AuthorizationScript {
    /// Succeed, echoing the claimed identity
    Allow,
    /// Fail with `AuthorizationFailed(code)`
    Deny(u64),
    /// Fail with `Retry(code)`
    Retry(u64),
}

pub struct ScriptedAuthorizationProxy {
    script: AuthorizationScript,
}

impl ScriptedAuthorizationProxy {
    pub fn new(script: AuthorizationScript) -> Self {
        Self { script }
    }
}

#[async_trait]
impl AuthorizationProxy for ScriptedAuthorizationProxy {
    async fn authorize(&self, request: AuthorizationRequest) -> Result<AuthorizationResponse> {
        match self.script {
            AuthorizationScript::Allow => {
                Ok(AuthorizationResponse { authorized_domain: request.claimed_identity })
            }
            AuthorizationScript::Deny(code) => Err(ServerError::AuthorizationFailed(code)),
            AuthorizationScript::Retry(code) => Err(ServerError::Retry(code)),
        }
    }
}

#[derive(Default)]
pub struct RecordingMetricClient {
    received: Mutex<Vec<String>>,
    completed: Mutex<Vec<ExecutionResult>>,
}

impl RecordingMetricClient {
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<ExecutionResult> {
        self.completed.lock().unwrap().clone()
    }
}

impl MetricClient for RecordingMetricClient {
    fn on_request_received(&self, method: &Method, path: &str) {
        self.received.lock().unwrap().push(format!("{} {}", method, path));
    }

    fn on_request_completed(
        &self,
        _method: &Method,
        _path: &str,
        result: &ExecutionResult,
        _latency: Duration,
    ) {
        self.completed.lock().unwrap().push(result.clone());
    }
}

#[derive(Default)]
struct RecorderState {
    calls: usize,
    result: Option<ExecutionResult>,
    response: Option<HttpResponse>,
}

/// Observes the transport completion of a request
#[derive(Clone, Default)]
pub struct CompletionRecorder {
    state: Arc<Mutex<RecorderState>>,
}

pub fn completion_recorder() -> CompletionRecorder {
    CompletionRecorder::default()
}

impl CompletionRecorder {
    pub fn callback(&self) -> impl FnOnce(&mut Http2Context) + Send + 'static {
        let state = self.state.clone();
        move |ctx| {
            let mut state = state.lock().unwrap();
            state.calls += 1;
            state.result = Some(ctx.result.clone());
            state.response = ctx.response.take();
        }
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn result(&self) -> Option<ExecutionResult> {
        self.state.lock().unwrap().result.clone()
    }

    pub fn body(&self) -> Option<String> {
        self.state.lock().unwrap().response.as_ref().map(|r| r.body_text())
    }
}
