//! hyper glue between accepted connections and the coordinator

use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use uuid::Uuid;

use crate::active_requests::Http2Context;
use crate::context::AsyncContext;
use crate::coordinator::RequestCoordinator;
use crate::error::ServerError;
use crate::http::response::Resp;
use crate::http::{error_response, not_found, outcome_to_response, HandlerRegistry, Http2Request, RequestId};

/// HTTP/2 `CANCEL` error code, reported when a request stream goes away early
pub const CANCEL: u32 = 0x8;

/// Everything a connection needs to serve requests
#[derive(Clone)]
pub(crate) struct Transport {
    pub registry: Arc<HandlerRegistry>,
    pub coordinator: Arc<RequestCoordinator>,
    pub tls: Option<TlsAcceptor>,
}

/// Accept until `shutdown` flips, then drain live connections
pub(crate) async fn accept_loop(
    listener: TcpListener,
    transport: Transport,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, remote_addr)) => {
                    connections.spawn(serve_connection(
                        stream,
                        remote_addr,
                        transport.clone(),
                        shutdown.clone(),
                    ));
                }
                Err(e) => log::warn!("Failed to accept connection: {}", e),
            },
        }
        while connections.try_join_next().is_some() {}
    }

    drop(listener);
    log::debug!("Accept loop stopped, draining {} connections", connections.len());
    while connections.join_next().await.is_some() {}
}

async fn serve_connection(
    stream: TcpStream,
    remote_addr: SocketAddr,
    transport: Transport,
    shutdown: watch::Receiver<bool>,
) {
    let activity_id = Uuid::new_v4();
    log::debug!("Connection {} from {}", activity_id, remote_addr);

    match transport.tls.clone() {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(stream) => serve_io(stream, activity_id, transport, shutdown).await,
            Err(e) => log::warn!("TLS handshake with {} failed: {}", remote_addr, e),
        },
        None => serve_io(stream, activity_id, transport, shutdown).await,
    }
}

async fn serve_io<IO>(
    io: IO,
    activity_id: Uuid,
    transport: Transport,
    mut shutdown: watch::Receiver<bool>,
) where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |req: Request<Incoming>| {
        dispatch(req, activity_id, transport.registry.clone(), transport.coordinator.clone())
    });

    let builder = AutoBuilder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(io), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = shutdown.changed() => {
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    };
    if let Err(e) = result {
        log::debug!("Connection {} closed with error: {}", activity_id, e);
    }
}

/// Fires cleanup for a request whose stream was dropped before completing
struct CleanupGuard {
    coordinator: Arc<RequestCoordinator>,
    activity_id: Uuid,
    request_id: RequestId,
    armed: bool,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.coordinator.on_cleanup(self.activity_id, self.request_id, CANCEL);
        }
    }
}

/// Route one request and wait for its single completion
pub(crate) async fn dispatch(
    req: Request<Incoming>,
    activity_id: Uuid,
    registry: Arc<HandlerRegistry>,
    coordinator: Arc<RequestCoordinator>,
) -> Result<Resp, Infallible> {
    let Some(handler) = registry.lookup(req.method(), req.uri().path()) else {
        log::debug!("No handler for {} {}", req.method(), req.uri().path());
        return Ok(not_found(req.method(), req.uri().path()));
    };

    let request_id = RequestId::new();
    let (parts, body) = req.into_parts();
    let request = Http2Request::from_parts(request_id, parts, body);

    let (tx, rx) = oneshot::channel();
    let context = AsyncContext::new(activity_id, request, move |ctx: &mut Http2Context| {
        let _ = tx.send((ctx.result.clone(), ctx.response.take()));
    });

    let mut guard = CleanupGuard { coordinator: coordinator.clone(), activity_id, request_id, armed: true };
    coordinator.handle_request(context, handler);

    let response = match rx.await {
        Ok((result, response)) => outcome_to_response(result, response),
        Err(_) => error_response(&ServerError::ContextAbandoned),
    };
    guard.armed = false;
    Ok(response)
}
