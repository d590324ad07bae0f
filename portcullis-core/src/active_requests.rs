//! In-flight request tracking
//!
//! Each request being served owns a [`SyncContext`] registered in the
//! [`ActiveRequestTable`]. Both structures are shared between the thread that
//! accepted the request and the threads finishing its authorization and handler
//! legs, so every operation here is lock-free or single-key atomic.
//!
//! Removal from the table is the single-winner step: whoever removes an entry
//! owns finalization of that request.

use bytes::Bytes;
use http::{HeaderMap, Method};
use scc::HashMap as SccHashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Instant;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::authorization::AuthorizationResponse;
use crate::context::AsyncContext;
use crate::error::{ExecutionResult, Result, ServerError};
use crate::http::{Http2Request, HttpHandler, HttpResponse, RequestId};

/// Transport-facing context of one request
pub type Http2Context = AsyncContext<Http2Request, HttpResponse>;

/// Receiver side of the body-receipt continuation
pub type BodyReceiver = oneshot::Receiver<Result<Bytes>>;

/// Legs a request waits on before it can complete normally
pub const LEG_COUNT: usize = 2;

/// Per-request state shared by the table and in-flight legs
pub struct SyncContext {
    pub request_id: RequestId,
    /// Connection-level activity the request belongs to
    pub activity_id: Uuid,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub handler: HttpHandler,
    pub received_at: Instant,
    pending_callbacks: AtomicUsize,
    failed: AtomicBool,
    first_failure: OnceLock<ServerError>,
    authorization: OnceLock<AuthorizationResponse>,
    http_context: Mutex<Option<Http2Context>>,
    handler_response: Mutex<Option<HttpResponse>>,
    body: Mutex<Option<BodyReceiver>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SyncContext {
    /// Wrap a transport context; both legs start pending
    pub fn new(http_context: Http2Context, handler: HttpHandler) -> Self {
        let request = &http_context.request;
        Self {
            request_id: request.id,
            activity_id: http_context.activity_id,
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            headers: request.headers.clone(),
            handler,
            received_at: Instant::now(),
            pending_callbacks: AtomicUsize::new(LEG_COUNT),
            failed: AtomicBool::new(false),
            first_failure: OnceLock::new(),
            authorization: OnceLock::new(),
            http_context: Mutex::new(Some(http_context)),
            handler_response: Mutex::new(None),
            body: Mutex::new(None),
        }
    }

    pub fn pending_callbacks(&self) -> usize {
        self.pending_callbacks.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Remove `count` pending units and return what is left
    ///
    /// Exactly one caller observes the transition to zero. Completing more
    /// than is pending logs an error and saturates at zero instead of wrapping.
    pub fn complete_pending(&self, count: usize) -> usize {
        let previous = self
            .pending_callbacks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| Some(pending.saturating_sub(count)))
            .unwrap_or_else(|pending| pending);
        if previous < count {
            log::error!(
                "Request {} completed {} legs with only {} pending",
                self.request_id,
                count,
                previous
            );
        }
        previous.saturating_sub(count)
    }

    /// Mark the request failed; only the first failure is kept
    pub fn record_failure(&self, error: ServerError) {
        if !self.failed.swap(true, Ordering::AcqRel) {
            let _ = self.first_failure.set(error);
        }
    }

    pub fn first_failure(&self) -> Option<&ServerError> {
        self.first_failure.get()
    }

    /// First failure if any leg failed, else success
    pub fn outcome(&self) -> ExecutionResult {
        match self.first_failure.get() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    pub fn set_authorization(&self, response: AuthorizationResponse) {
        let _ = self.authorization.set(response);
    }

    pub fn authorized_domain(&self) -> Option<String> {
        self.authorization.get().map(|a| a.authorized_domain.clone())
    }

    pub fn set_handler_response(&self, response: Option<HttpResponse>) {
        *lock(&self.handler_response) = response;
    }

    pub fn install_body_receiver(&self, receiver: BodyReceiver) {
        *lock(&self.body) = Some(receiver);
    }

    pub fn take_body_receiver(&self) -> Option<BodyReceiver> {
        lock(&self.body).take()
    }

    pub fn has_body_receiver(&self) -> bool {
        lock(&self.body).is_some()
    }

    /// Take the transport context for finalization; `None` once taken
    pub fn take_http_context(&self) -> Option<Http2Context> {
        lock(&self.http_context).take()
    }

    pub fn take_handler_response(&self) -> Option<HttpResponse> {
        lock(&self.handler_response).take()
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("pending_callbacks", &self.pending_callbacks())
            .field("failed", &self.failed())
            .finish()
    }
}

/// Concurrent map of request id → in-flight [`SyncContext`]
#[derive(Default)]
pub struct ActiveRequestTable {
    entries: SccHashMap<RequestId, Arc<SyncContext>>,
}

impl ActiveRequestTable {
    pub fn new() -> Self {
        Self { entries: SccHashMap::new() }
    }

    /// Insert without overwriting; a colliding id hands the context back
    pub fn insert(&self, context: Arc<SyncContext>) -> std::result::Result<(), Arc<SyncContext>> {
        self.entries.insert_sync(context.request_id, context).map_err(|(_, rejected)| rejected)
    }

    pub fn find(&self, request_id: &RequestId) -> Result<Arc<SyncContext>> {
        self.entries
            .read_sync(request_id, |_, context| context.clone())
            .ok_or(ServerError::RequestNotFound(*request_id))
    }

    /// Remove an entry; at most one caller gets `Ok` per insertion
    pub fn remove(&self, request_id: &RequestId) -> Result<Arc<SyncContext>> {
        self.entries
            .remove_sync(request_id)
            .map(|(_, context)| context)
            .ok_or(ServerError::RequestNotFound(*request_id))
    }

    pub fn contains(&self, request_id: &RequestId) -> bool {
        self.entries.contains_sync(request_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
