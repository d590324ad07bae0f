//! Request lifecycle coordination
//!
//! Every routed request goes through two independently completing legs:
//!
//! 1. **Authorization**, dispatched as soon as the request arrives
//! 2. **Handler**, dispatched only after authorization succeeds
//!
//! Both legs report through [`RequestCoordinator::on_pending_callback`], which
//! decrements the request's pending count with a single atomic
//! fetch-and-subtract. The invocation that sees the count reach zero removes the
//! table entry and fires the transport completion with the first observed
//! failure, or success.
//!
//! The transport may also signal abnormal teardown through
//! [`RequestCoordinator::on_cleanup`]. Cleanup and normal completion race on the
//! table removal; the loser finds nothing and does nothing, so the transport
//! completion fires exactly once.

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::active_requests::{ActiveRequestTable, Http2Context, SyncContext, LEG_COUNT};
use crate::authorization::{AuthorizationProxy, AuthorizationRequest, AuthorizationResponse};
use crate::context::AsyncContext;
use crate::error::{ExecutionResult, Result, ServerError};
use crate::executor::AsyncExecutor;
use crate::http::{HttpHandler, HttpRequest, HttpResponse, RequestBody, RequestId};
use crate::metrics::MetricClient;

/// The two units of asynchronous work tracked per request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Authorization,
    Handler,
}

/// Drives every request from arrival to exactly one completion
pub struct RequestCoordinator {
    executor: Arc<dyn AsyncExecutor>,
    authorization_proxy: Arc<dyn AuthorizationProxy>,
    metric_client: Option<Arc<dyn MetricClient>>,
    active_requests: ActiveRequestTable,
    max_body_size: usize,
}

impl RequestCoordinator {
    pub fn new(
        executor: Arc<dyn AsyncExecutor>,
        authorization_proxy: Arc<dyn AuthorizationProxy>,
        metric_client: Option<Arc<dyn MetricClient>>,
        max_body_size: usize,
    ) -> Self {
        Self {
            executor,
            authorization_proxy,
            metric_client,
            active_requests: ActiveRequestTable::new(),
            max_body_size,
        }
    }

    pub fn active_requests(&self) -> &ActiveRequestTable {
        &self.active_requests
    }

    /// Start serving a routed request
    ///
    /// Registers the request, starts receiving its body in the background and
    /// submits authorization. Never blocks; the only synchronous effect is the
    /// table insertion.
    pub fn handle_request(self: &Arc<Self>, mut http_context: Http2Context, handler: HttpHandler) {
        let request_id = http_context.request.id;
        let body = http_context.request.take_body();
        let authorization_request = AuthorizationRequest::from_request(&http_context.request);
        let sync_context = Arc::new(SyncContext::new(http_context, handler));

        if let Some(metrics) = &self.metric_client {
            metrics.on_request_received(&sync_context.method, &sync_context.path);
        }

        if let Err(rejected) = self.active_requests.insert(sync_context.clone()) {
            log::error!("Request id {} is already active, rejecting duplicate", request_id);
            if let Some(mut http_context) = rejected.take_http_context() {
                http_context.fail(ServerError::RequestAlreadyExists(request_id));
                http_context.finish();
            }
            return;
        }
        log::debug!(
            "Request {} {} {} registered ({} pending)",
            request_id,
            sync_context.method,
            sync_context.path,
            sync_context.pending_callbacks()
        );

        self.install_body_continuation(&sync_context, body);
        self.dispatch_authorization(sync_context.activity_id, request_id, authorization_request);
    }

    /// Account for one completed leg
    ///
    /// A lookup miss means the request was already finalized (usually by
    /// cleanup) and is ignored. Safe to call concurrently from both legs.
    pub fn on_pending_callback(
        self: &Arc<Self>,
        leg: Leg,
        execution_result: ExecutionResult,
        request_id: RequestId,
    ) {
        let sync_context = match self.active_requests.find(&request_id) {
            Ok(sync_context) => sync_context,
            Err(_) => {
                log::debug!("{:?} leg reported for finalized request {}", leg, request_id);
                return;
            }
        };

        let succeeded = execution_result.is_ok();
        let completed = match execution_result {
            Ok(()) => 1,
            Err(error) => {
                log::debug!("{:?} leg failed for request {}: {}", leg, request_id, error);
                sync_context.record_failure(error);
                match leg {
                    // The handler leg is never dispatched; settle it now
                    Leg::Authorization => LEG_COUNT,
                    Leg::Handler => 1,
                }
            }
        };

        let remaining = sync_context.complete_pending(completed);
        log::debug!("Request {} has {} pending legs", request_id, remaining);

        if remaining == 0 {
            self.finalize(&request_id);
        } else if leg == Leg::Authorization && succeeded {
            self.dispatch_handler(sync_context);
        }
    }

    /// Transport signal for abnormal teardown (client reset, connection loss)
    ///
    /// Fires the request's completion if it is still active, whatever its
    /// pending count. Returns `RequestNotFound` when normal completion already
    /// won; that is an expected race, not an error.
    pub fn on_cleanup(
        &self,
        activity_id: Uuid,
        request_id: RequestId,
        reason_code: u32,
    ) -> ExecutionResult {
        let sync_context = match self.active_requests.remove(&request_id) {
            Ok(sync_context) => sync_context,
            Err(error) => {
                log::debug!(
                    "Cleanup for request {} (activity {}) found nothing to do",
                    request_id,
                    activity_id
                );
                return Err(error);
            }
        };

        log::debug!(
            "Cleaning up request {} (activity {}, reason {:#x}, {} pending)",
            request_id,
            activity_id,
            reason_code,
            sync_context.pending_callbacks()
        );
        let result = if sync_context.pending_callbacks() == 0 {
            sync_context.outcome()
        } else {
            Err(sync_context
                .first_failure()
                .cloned()
                .unwrap_or(ServerError::RequestAborted(reason_code)))
        };
        self.complete(&sync_context, result);
        Ok(())
    }

    fn finalize(&self, request_id: &RequestId) {
        match self.active_requests.remove(request_id) {
            Ok(sync_context) => {
                let result = sync_context.outcome();
                self.complete(&sync_context, result);
            }
            Err(_) => log::debug!("Request {} was already finalized by cleanup", request_id),
        }
    }

    /// Fire the transport completion; callers must have won the table removal
    fn complete(&self, sync_context: &SyncContext, result: ExecutionResult) {
        if let Some(metrics) = &self.metric_client {
            metrics.on_request_completed(
                &sync_context.method,
                &sync_context.path,
                &result,
                sync_context.received_at.elapsed(),
            );
        }

        let Some(mut http_context) = sync_context.take_http_context() else {
            log::error!("Request {} completion already fired", sync_context.request_id);
            return;
        };
        match result {
            Ok(()) => {
                let response = sync_context.take_handler_response().unwrap_or_default();
                http_context.succeed(response);
            }
            Err(error) => http_context.fail(error),
        }
        http_context.finish();
    }

    fn install_body_continuation(&self, sync_context: &SyncContext, body: Option<RequestBody>) {
        let (tx, rx) = oneshot::channel();
        sync_context.install_body_receiver(rx);

        let limit = self.max_body_size;
        let task = async move {
            let received = match body {
                Some(body) => collect_body(body, limit).await,
                None => Ok(Bytes::new()),
            };
            let _ = tx.send(received);
        };
        if let Err(error) = self.executor.schedule(Box::pin(task)) {
            log::warn!(
                "Could not schedule body receipt for request {}: {}",
                sync_context.request_id,
                error
            );
        }
    }

    fn dispatch_authorization(
        self: &Arc<Self>,
        activity_id: Uuid,
        request_id: RequestId,
        authorization_request: AuthorizationRequest,
    ) {
        let coordinator = Arc::downgrade(self);
        let context = AsyncContext::<AuthorizationRequest, AuthorizationResponse>::new(
            activity_id,
            authorization_request,
            move |ctx| {
                let Some(coordinator) = coordinator.upgrade() else { return };
                if let Some(response) = ctx.response.take() {
                    if let Ok(sync_context) = coordinator.active_requests.find(&request_id) {
                        sync_context.set_authorization(response);
                    }
                }
                coordinator.on_pending_callback(Leg::Authorization, ctx.result.clone(), request_id);
            },
        );

        let proxy = self.authorization_proxy.clone();
        let task = async move {
            let mut context = context;
            match proxy.authorize(context.request.clone()).await {
                Ok(response) => context.succeed(response),
                Err(error) => context.fail(error),
            }
            context.finish();
        };
        // A rejected task drops its context, which reports the leg as failed
        if let Err(error) = self.executor.schedule(Box::pin(task)) {
            log::warn!("Could not schedule authorization for request {}: {}", request_id, error);
        }
    }

    fn dispatch_handler(self: &Arc<Self>, sync_context: Arc<SyncContext>) {
        let request_id = sync_context.request_id;
        let request = HttpRequest {
            id: request_id,
            method: sync_context.method.clone(),
            path: sync_context.path.clone(),
            query: sync_context.query.clone(),
            headers: sync_context.headers.clone(),
            body: Bytes::new(),
            authorized_domain: sync_context.authorized_domain(),
        };

        let coordinator: Weak<Self> = Arc::downgrade(self);
        let context = AsyncContext::<HttpRequest, HttpResponse>::new(
            sync_context.activity_id,
            request,
            move |ctx| {
                let Some(coordinator) = coordinator.upgrade() else { return };
                if let Ok(sync_context) = coordinator.active_requests.find(&request_id) {
                    sync_context.set_handler_response(ctx.response.take());
                }
                coordinator.on_pending_callback(Leg::Handler, ctx.result.clone(), request_id);
            },
        );

        let body = sync_context.take_body_receiver();
        let handler = sync_context.handler.clone();
        drop(sync_context);

        let task = async move {
            let mut context = context;
            let received = match body {
                Some(body) => body.await.unwrap_or_else(|_| {
                    Err(ServerError::BodyReadFailed("body receipt was cancelled".to_string()))
                }),
                None => Ok(Bytes::new()),
            };
            match received {
                Ok(bytes) => {
                    context.request.body = bytes;
                    match handler(context.request.clone()).await {
                        Ok(response) => context.succeed(response),
                        Err(error) => context.fail(error),
                    }
                }
                Err(error) => context.fail(error),
            }
            context.finish();
        };
        if let Err(error) = self.executor.schedule(Box::pin(task)) {
            log::warn!("Could not schedule handler for request {}: {}", request_id, error);
        }
    }
}

async fn collect_body(body: RequestBody, limit: usize) -> Result<Bytes> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(error) => {
            if error.downcast_ref::<LengthLimitError>().is_some() {
                return Err(ServerError::BodyTooLarge { limit });
            }
            match error.downcast::<ServerError>() {
                Ok(error) => Err(*error),
                Err(error) => Err(ServerError::BodyReadFailed(error.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{handler_fn, Http2Request};
    use crate::testing::{
        completion_recorder, AuthorizationScript, CompletionRecorder, InlineExecutor, ManualExecutor,
        RecordingMetricClient, ScriptedAuthorizationProxy,
    };
    use http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn coordinator(
        executor: Arc<dyn AsyncExecutor>,
        script: AuthorizationScript,
    ) -> Arc<RequestCoordinator> {
        Arc::new(RequestCoordinator::new(
            executor,
            Arc::new(ScriptedAuthorizationProxy::new(script)),
            None,
            1024,
        ))
    }

    fn http_context(path: &str, body: &str, recorder: &CompletionRecorder) -> Http2Context {
        let request = Http2Request::with_bytes(RequestId::new(), Method::GET, path, body.to_string());
        AsyncContext::new(Uuid::new_v4(), request, recorder.callback())
    }

    fn hello_handler(invocations: Arc<AtomicUsize>) -> HttpHandler {
        handler_fn(move |req: HttpRequest| {
            invocations.fetch_add(1, Ordering::SeqCst);
            async move { Ok(HttpResponse::text(format!("hello {}", req.body_text()))) }
        })
    }

    #[test]
    fn test_dispatch_registers_context_with_two_pending_legs() {
        let executor = Arc::new(ManualExecutor::new());
        let coordinator = coordinator(executor.clone(), AuthorizationScript::Allow);
        let recorder = completion_recorder();
        let context = http_context("/test", "", &recorder);
        let request_id = context.request.id;

        coordinator.handle_request(context, hello_handler(Arc::new(AtomicUsize::new(0))));

        let sync_context = coordinator.active_requests().find(&request_id).unwrap();
        assert_eq!(sync_context.pending_callbacks(), 2);
        assert!(!sync_context.failed());
        assert!(sync_context.has_body_receiver());
        assert_eq!(recorder.calls(), 0);
        // Body receipt and authorization are queued, nothing ran inline
        assert_eq!(executor.pending(), 2);
    }

    #[test]
    fn test_pending_count_steps_down_leg_by_leg() {
        let executor = Arc::new(ManualExecutor::new());
        let coordinator = coordinator(executor.clone(), AuthorizationScript::Allow);
        let recorder = completion_recorder();
        let invocations = Arc::new(AtomicUsize::new(0));
        let context = http_context("/test", "world", &recorder);
        let request_id = context.request.id;

        coordinator.handle_request(context, hello_handler(invocations.clone()));
        let sync_context = coordinator.active_requests().find(&request_id).unwrap();

        assert!(executor.run_next()); // body receipt
        assert!(executor.run_next()); // authorization
        assert_eq!(sync_context.pending_callbacks(), 1);
        assert_eq!(invocations.load(Ordering::SeqCst), 0);

        assert!(executor.run_next()); // handler
        assert_eq!(sync_context.pending_callbacks(), 0);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert!(!coordinator.active_requests().contains(&request_id));

        assert_eq!(recorder.calls(), 1);
        assert_eq!(recorder.result(), Some(Ok(())));
        assert_eq!(recorder.body().as_deref(), Some("hello world"));
    }

    #[test]
    fn test_success_completes_exactly_once() {
        let coordinator = coordinator(Arc::new(InlineExecutor), AuthorizationScript::Allow);
        let recorder = completion_recorder();
        let context = http_context("/test", "", &recorder);
        let request_id = context.request.id;

        coordinator.handle_request(context, hello_handler(Arc::new(AtomicUsize::new(0))));

        assert_eq!(recorder.calls(), 1);
        assert_eq!(recorder.result(), Some(Ok(())));
        assert!(coordinator.active_requests().is_empty());
        assert!(coordinator.active_requests().find(&request_id).is_err());
    }

    #[test]
    fn test_authorization_failure_suppresses_handler() {
        let coordinator =
            coordinator(Arc::new(InlineExecutor), AuthorizationScript::Deny(123));
        let recorder = completion_recorder();
        let invocations = Arc::new(AtomicUsize::new(0));
        let context = http_context("/test", "", &recorder);

        coordinator.handle_request(context, hello_handler(invocations.clone()));

        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.calls(), 1);
        assert_eq!(recorder.result(), Some(Err(ServerError::AuthorizationFailed(123))));
        assert!(coordinator.active_requests().is_empty());
    }

    #[test]
    fn test_authorization_retry_suppresses_handler() {
        let coordinator = coordinator(Arc::new(InlineExecutor), AuthorizationScript::Retry(42));
        let recorder = completion_recorder();
        let invocations = Arc::new(AtomicUsize::new(0));
        let context = http_context("/test", "", &recorder);

        coordinator.handle_request(context, hello_handler(invocations.clone()));

        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.calls(), 1);
        assert_eq!(recorder.result(), Some(Err(ServerError::Retry(42))));
        assert!(coordinator.active_requests().is_empty());

        let response = crate::http::error_response(&ServerError::Retry(42));
        assert_eq!(response.status(), http::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get(http::header::RETRY_AFTER).unwrap(), "1");
    }

    #[test]
    fn test_authorization_failure_marks_context_failed() {
        let executor = Arc::new(ManualExecutor::new());
        let coordinator = coordinator(executor.clone(), AuthorizationScript::Deny(7));
        let recorder = completion_recorder();
        let invocations = Arc::new(AtomicUsize::new(0));
        let context = http_context("/test", "", &recorder);
        let request_id = context.request.id;

        coordinator.handle_request(context, hello_handler(invocations.clone()));
        let sync_context = coordinator.active_requests().find(&request_id).unwrap();
        executor.run_all();

        assert!(sync_context.failed());
        assert_eq!(sync_context.pending_callbacks(), 0);
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.result(), Some(Err(ServerError::AuthorizationFailed(7))));
    }

    #[test]
    fn test_handler_failure_is_reported() {
        let coordinator = coordinator(Arc::new(InlineExecutor), AuthorizationScript::Allow);
        let recorder = completion_recorder();
        let context = http_context("/test", "", &recorder);
        let failing =
            handler_fn(|_req| async { Err::<HttpResponse, _>(ServerError::HandlerFailed(12345)) });

        coordinator.handle_request(context, failing);

        assert_eq!(recorder.calls(), 1);
        assert_eq!(recorder.result(), Some(Err(ServerError::HandlerFailed(12345))));
    }

    #[test]
    fn test_authorized_domain_reaches_handler() {
        let coordinator = coordinator(Arc::new(InlineExecutor), AuthorizationScript::Allow);
        let recorder = completion_recorder();
        let request = Http2Request::with_bytes(RequestId::new(), Method::GET, "/whoami", "")
            .with_header(
                http::HeaderName::from_static(crate::http::CLAIMED_IDENTITY_HEADER),
                "domain.com",
            );
        let context = AsyncContext::new(Uuid::new_v4(), request, recorder.callback());
        let whoami = handler_fn(|req: HttpRequest| async move {
            Ok(HttpResponse::text(req.authorized_domain.unwrap_or_default()))
        });

        coordinator.handle_request(context, whoami);

        assert_eq!(recorder.body().as_deref(), Some("domain.com"));
    }

    #[test]
    fn test_cleanup_after_completion_is_not_found() {
        let coordinator = coordinator(Arc::new(InlineExecutor), AuthorizationScript::Allow);
        let recorder = completion_recorder();
        let context = http_context("/test", "", &recorder);
        let (activity_id, request_id) = (context.activity_id, context.request.id);

        coordinator.handle_request(context, hello_handler(Arc::new(AtomicUsize::new(0))));
        assert_eq!(recorder.calls(), 1);

        let result = coordinator.on_cleanup(activity_id, request_id, 0);
        assert_eq!(result, Err(ServerError::RequestNotFound(request_id)));
        assert_eq!(recorder.calls(), 1);
    }

    #[test]
    fn test_cleanup_fires_completion_before_legs_report() {
        let executor = Arc::new(ManualExecutor::new());
        let coordinator = coordinator(executor.clone(), AuthorizationScript::Allow);
        let recorder = completion_recorder();
        let invocations = Arc::new(AtomicUsize::new(0));
        let context = http_context("/test", "", &recorder);
        let (activity_id, request_id) = (context.activity_id, context.request.id);

        coordinator.handle_request(context, hello_handler(invocations.clone()));
        assert!(coordinator.on_cleanup(activity_id, request_id, 0x8).is_ok());
        assert_eq!(recorder.calls(), 1);
        assert_eq!(recorder.result(), Some(Err(ServerError::RequestAborted(0x8))));

        // In-flight legs still report later, against a missing entry
        executor.run_all();
        assert_eq!(recorder.calls(), 1);
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        assert!(coordinator.active_requests().is_empty());
    }

    #[test]
    fn test_late_pending_callback_is_noop() {
        let coordinator = coordinator(Arc::new(InlineExecutor), AuthorizationScript::Allow);
        coordinator.on_pending_callback(
            Leg::Handler,
            Err(ServerError::HandlerFailed(1)),
            RequestId::new(),
        );
        assert!(coordinator.active_requests().is_empty());
    }

    #[test]
    fn test_handler_failure_then_cleanup_keeps_single_completion() {
        let executor = Arc::new(ManualExecutor::new());
        let coordinator = coordinator(executor.clone(), AuthorizationScript::Allow);
        let recorder = completion_recorder();
        let context = http_context("/test", "", &recorder);
        let (activity_id, request_id) = (context.activity_id, context.request.id);
        let failing =
            handler_fn(|_req| async { Err::<HttpResponse, _>(ServerError::HandlerFailed(1234)) });

        coordinator.handle_request(context, failing);
        executor.run_all();
        assert_eq!(recorder.result(), Some(Err(ServerError::HandlerFailed(1234))));

        coordinator.on_pending_callback(
            Leg::Handler,
            Err(ServerError::HandlerFailed(1234)),
            request_id,
        );
        assert!(coordinator.on_cleanup(activity_id, request_id, 0).is_err());
        assert_eq!(recorder.calls(), 1);
    }

    #[test]
    fn test_racing_cleanup_and_completion_fire_once() {
        for _ in 0..64 {
            let executor = Arc::new(ManualExecutor::new());
            let coordinator = coordinator(executor.clone(), AuthorizationScript::Allow);
            let recorder = completion_recorder();
            let context = http_context("/test", "", &recorder);
            let (activity_id, request_id) = (context.activity_id, context.request.id);
            coordinator.handle_request(context, hello_handler(Arc::new(AtomicUsize::new(0))));

            let runner = {
                let executor = executor.clone();
                std::thread::spawn(move || executor.run_all())
            };
            let cleaner = {
                let coordinator = coordinator.clone();
                std::thread::spawn(move || coordinator.on_cleanup(activity_id, request_id, 0x8))
            };
            runner.join().unwrap();
            let _ = cleaner.join().unwrap();
            executor.run_all();

            assert_eq!(recorder.calls(), 1);
            assert!(coordinator.active_requests().is_empty());
        }
    }

    #[test]
    fn test_duplicate_request_id_is_rejected() {
        let executor = Arc::new(ManualExecutor::new());
        let coordinator = coordinator(executor.clone(), AuthorizationScript::Allow);
        let request_id = RequestId::new();
        let first_recorder = completion_recorder();
        let second_recorder = completion_recorder();
        let first = AsyncContext::new(
            Uuid::new_v4(),
            Http2Request::with_bytes(request_id, Method::GET, "/test", ""),
            first_recorder.callback(),
        );
        let second = AsyncContext::new(
            Uuid::new_v4(),
            Http2Request::with_bytes(request_id, Method::GET, "/test", ""),
            second_recorder.callback(),
        );
        let handler = hello_handler(Arc::new(AtomicUsize::new(0)));

        coordinator.handle_request(first, handler.clone());
        coordinator.handle_request(second, handler);

        assert_eq!(second_recorder.result(), Some(Err(ServerError::RequestAlreadyExists(request_id))));
        assert_eq!(first_recorder.calls(), 0);
        executor.run_all();
        assert_eq!(first_recorder.result(), Some(Ok(())));
    }

    #[test]
    fn test_rejected_schedule_still_completes() {
        let coordinator = coordinator(
            Arc::new(crate::testing::RejectingExecutor),
            AuthorizationScript::Allow,
        );
        let recorder = completion_recorder();
        coordinator.handle_request(
            http_context("/test", "", &recorder),
            hello_handler(Arc::new(AtomicUsize::new(0))),
        );

        assert_eq!(recorder.calls(), 1);
        assert_eq!(recorder.result(), Some(Err(ServerError::ContextAbandoned)));
        assert!(coordinator.active_requests().is_empty());
    }

    #[test]
    fn test_oversized_body_fails_handler_leg() {
        let coordinator = Arc::new(RequestCoordinator::new(
            Arc::new(InlineExecutor),
            Arc::new(ScriptedAuthorizationProxy::new(AuthorizationScript::Allow)),
            None,
            4,
        ));
        let recorder = completion_recorder();
        let invocations = Arc::new(AtomicUsize::new(0));

        coordinator.handle_request(
            http_context("/upload", "far too long", &recorder),
            hello_handler(invocations.clone()),
        );

        assert_eq!(invocations.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.result(), Some(Err(ServerError::BodyTooLarge { limit: 4 })));
    }

    #[test]
    fn test_metrics_see_request_and_outcome() {
        let metrics = Arc::new(RecordingMetricClient::default());
        let coordinator = Arc::new(RequestCoordinator::new(
            Arc::new(InlineExecutor),
            Arc::new(ScriptedAuthorizationProxy::new(AuthorizationScript::Deny(9))),
            Some(metrics.clone()),
            1024,
        ));
        let recorder = completion_recorder();

        coordinator.handle_request(
            http_context("/metered", "", &recorder),
            hello_handler(Arc::new(AtomicUsize::new(0))),
        );

        assert_eq!(metrics.received(), vec!["GET /metered".to_string()]);
        assert_eq!(metrics.completed(), vec![Err(ServerError::AuthorizationFailed(9))]);
    }
}
