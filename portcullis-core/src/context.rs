//! One-shot request/response context
//!
//! [`AsyncContext`] carries an input, an optional output, a terminal result and a
//! completion callback. The same type wraps the transport-facing request, the
//! authorization leg and the handler leg.
//!
//! Completion is structurally one-shot: [`AsyncContext::finish`] consumes the
//! context, and a context dropped without finishing reports
//! [`ServerError::ContextAbandoned`] through the same callback. A leg that
//! panics or is never scheduled still reports exactly once.

use uuid::Uuid;

use crate::error::{ExecutionResult, ServerError};

type Completion<Req, Resp> = Box<dyn FnOnce(&mut AsyncContext<Req, Resp>) + Send>;

/// Generic async wrapper around one request and its eventual response
pub struct AsyncContext<Req, Resp> {
    /// Activity that spawned this context (the connection, for transport requests)
    pub activity_id: Uuid,
    pub request: Req,
    pub response: Option<Resp>,
    pub result: ExecutionResult,
    completion: Option<Completion<Req, Resp>>,
}

impl<Req, Resp> AsyncContext<Req, Resp> {
    /// Create a context whose `completion` fires once, on finish or drop
    pub fn new<F>(activity_id: Uuid, request: Req, completion: F) -> Self
    where
        F: FnOnce(&mut AsyncContext<Req, Resp>) + Send + 'static,
    {
        Self {
            activity_id,
            request,
            response: None,
            result: Ok(()),
            completion: Some(Box::new(completion)),
        }
    }

    /// Record a successful outcome
    pub fn succeed(&mut self, response: Resp) {
        self.response = Some(response);
        self.result = Ok(());
    }

    /// Record a failed outcome
    pub fn fail(&mut self, error: ServerError) {
        self.result = Err(error);
    }

    /// Fire the completion callback, consuming the context
    pub fn finish(mut self) {
        if let Some(completion) = self.completion.take() {
            completion(&mut self);
        }
    }
}

impl<Req, Resp> Drop for AsyncContext<Req, Resp> {
    fn drop(&mut self) {
        if let Some(completion) = self.completion.take() {
            if self.result.is_ok() {
                self.result = Err(ServerError::ContextAbandoned);
            }
            completion(self);
        }
    }
}

impl<Req: std::fmt::Debug, Resp> std::fmt::Debug for AsyncContext<Req, Resp> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncContext")
            .field("activity_id", &self.activity_id)
            .field("request", &self.request)
            .field("has_response", &self.response.is_some())
            .field("result", &self.result)
            .field("finished", &self.completion.is_none())
            .finish()
    }
}
