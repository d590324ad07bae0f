//! HTTP/2 server lifecycle
//!
//! [`Http2Server`] owns the handler registry, the request coordinator and the
//! transport. Its lifecycle is a two-state machine:
//!
//! ```text
//! Stopped --run()--> Running --stop()--> Stopped
//! ```
//!
//! `init()` builds the TLS context ahead of `run()` and may be retried; it
//! never changes the lifecycle state.
//!
//! # Example
//!
//! ```no_run
//! use http::Method;
//! use portcullis_core::http::{handler_fn, HttpResponse};
//! use portcullis_core::server::Http2Server;
//!
//! let server = Http2Server::builder().with_port(8443).build()?;
//! server.register_resource_handler(
//!     Method::GET,
//!     "/hello",
//!     handler_fn(|_req| async { Ok(HttpResponse::text("hello")) }),
//! )?;
//! server.init()?;
//! server.run()?;
//! // ...
//! server.stop()?;
//! # Ok::<(), portcullis_core::ServerError>(())
//! ```

pub mod builder;
pub(crate) mod transport;

pub use builder::Http2ServerBuilder;
pub use transport::CANCEL;

use http::Method;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use crate::config::ServerConfig;
use crate::coordinator::RequestCoordinator;
use crate::error::{ExecutionResult, Result, ServerError};
use crate::http::{HandlerRegistry, HttpHandler};
use crate::tls::TlsContextBuilder;
use transport::Transport;

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Running,
}

struct RunningServer {
    runtime: Runtime,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
    local_addr: SocketAddr,
}

enum Lifecycle {
    Stopped,
    Running(RunningServer),
}

/// Embeddable HTTP/2 server
pub struct Http2Server {
    config: ServerConfig,
    registry: Arc<HandlerRegistry>,
    coordinator: Arc<RequestCoordinator>,
    tls_acceptor: Mutex<Option<TlsAcceptor>>,
    lifecycle: Mutex<Lifecycle>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Http2Server {
    pub fn builder() -> Http2ServerBuilder {
        Http2ServerBuilder::new()
    }

    pub(crate) fn from_parts(config: ServerConfig, coordinator: Arc<RequestCoordinator>) -> Self {
        Self {
            config,
            registry: Arc::new(HandlerRegistry::new()),
            coordinator,
            tls_acceptor: Mutex::new(None),
            lifecycle: Mutex::new(Lifecycle::Stopped),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Register a handler for an exact (method, path) pair
    ///
    /// Allowed in any state; a registration made while running is visible to
    /// the next request.
    pub fn register_resource_handler(
        &self,
        method: Method,
        path: impl Into<String>,
        handler: HttpHandler,
    ) -> ExecutionResult {
        self.registry.register(method, path, handler)
    }

    /// Build the TLS context when TLS is enabled
    pub fn init(&self) -> ExecutionResult {
        if !self.config.tls_enabled {
            log::debug!("TLS disabled, nothing to initialize");
            return Ok(());
        }

        let (Some(key), Some(cert)) =
            (&self.config.tls_private_key_path, &self.config.tls_cert_chain_path)
        else {
            return Err(ServerError::TlsInitFailed(
                "TLS is enabled but key or certificate path is missing".to_string(),
            ));
        };

        let acceptor = TlsContextBuilder::new(key, cert).build()?;
        *lock(&self.tls_acceptor) = Some(acceptor);
        log::info!("🔒 TLS context initialized");
        Ok(())
    }

    /// Start accepting connections
    pub fn run(&self) -> ExecutionResult {
        let mut lifecycle = lock(&self.lifecycle);
        if let Lifecycle::Running(_) = *lifecycle {
            return Err(ServerError::AlreadyRunning);
        }

        let tls = self.tls_for_run()?;

        let address = self.config.address();
        let listener = std::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
            .and_then(|listener| listener.set_nonblocking(true).map(|_| listener))
            .map_err(|e| ServerError::TransportFailed(format!("Failed to bind to {}: {}", address, e)))?;
        let local_addr = listener.local_addr().map_err(|e| ServerError::TransportFailed(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.thread_pool_size.max(1))
            .thread_name("portcullis-io")
            .enable_all()
            .build()
            .map_err(|e| ServerError::TransportFailed(e.to_string()))?;

        let listener = {
            let _guard = runtime.enter();
            tokio::net::TcpListener::from_std(listener)
        };
        let listener = match listener {
            Ok(listener) => listener,
            Err(e) => {
                runtime.shutdown_background();
                return Err(ServerError::TransportFailed(e.to_string()));
            }
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let transport = Transport {
            registry: self.registry.clone(),
            coordinator: self.coordinator.clone(),
            tls: tls.clone(),
        };
        let accept_task = runtime.spawn(transport::accept_loop(listener, transport, shutdown_rx));

        *lifecycle = Lifecycle::Running(RunningServer { runtime, shutdown, accept_task, local_addr });
        log::info!(
            "✅ Server listening on {}://{} ({} I/O threads)",
            if tls.is_some() { "https" } else { "http" },
            local_addr,
            self.config.thread_pool_size
        );
        Ok(())
    }

    /// Stop accepting, let live connections wind down, release I/O threads
    ///
    /// Called from a plain thread, this returns once the listener is closed
    /// and connections had up to `shutdown_grace_ms` to finish, so the port
    /// can be bound again right away. Called from inside a tokio runtime it
    /// cannot block: the I/O runtime is shut down in the background and the
    /// listener is released shortly after the state reads `Stopped`.
    pub fn stop(&self) -> ExecutionResult {
        // Held until teardown is over so a concurrent run() waits for the port
        let mut lifecycle = lock(&self.lifecycle);
        let running = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running(running) => running,
            Lifecycle::Stopped => return Err(ServerError::AlreadyStopped),
        };
        let RunningServer { runtime, shutdown, accept_task, local_addr } = running;
        let grace = Duration::from_millis(self.config.shutdown_grace_ms);

        let _ = shutdown.send(true);
        if Handle::try_current().is_ok() {
            log::debug!("stop() called inside a runtime, shutting down in the background");
            runtime.shutdown_background();
        } else {
            let drained = runtime.block_on(async { tokio::time::timeout(grace, accept_task).await });
            if drained.is_err() {
                log::warn!("Connections still open after {:?}, forcing shutdown", grace);
            }
            runtime.shutdown_timeout(grace);
        }

        drop(lifecycle);
        log::info!("🛑 Server on {} stopped", local_addr);
        Ok(())
    }

    pub fn state(&self) -> ServerState {
        match *lock(&self.lifecycle) {
            Lifecycle::Stopped => ServerState::Stopped,
            Lifecycle::Running(_) => ServerState::Running,
        }
    }

    /// Bound address while running; reflects the real port when 0 was configured
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*lock(&self.lifecycle) {
            Lifecycle::Running(running) => Some(running.local_addr),
            Lifecycle::Stopped => None,
        }
    }

    /// Requests currently between arrival and completion
    pub fn active_request_count(&self) -> usize {
        self.coordinator.active_requests().len()
    }

    fn tls_for_run(&self) -> Result<Option<TlsAcceptor>> {
        if !self.config.tls_enabled {
            return Ok(None);
        }
        if lock(&self.tls_acceptor).is_none() {
            self.init()?;
        }
        Ok(lock(&self.tls_acceptor).clone())
    }
}

impl Drop for Http2Server {
    fn drop(&mut self) {
        if self.state() == ServerState::Running {
            let _ = self.stop();
        }
    }
}
