//! Portcullis - Core
//!
//! An embeddable HTTP/2 serving core. Handlers are routed by exact
//! (method, path), every request is gated through a pluggable authorization
//! decision, and each request completes exactly once even when the client
//! resets its stream mid-flight.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use http::Method;
//! use portcullis_core::http::{handler_fn, HttpResponse};
//! use portcullis_core::Http2Server;
//!
//! fn main() -> Result<(), portcullis_core::ServerError> {
//!     portcullis_core::logging::init_logging(&Default::default());
//!
//!     let server = Http2Server::builder()
//!         .with_port(8443)
//!         .with_tls("key.pem", "cert.pem")
//!         .build()?;
//!     server.register_resource_handler(
//!         Method::GET,
//!         "/test",
//!         handler_fn(|_req| async { Ok(HttpResponse::text("hello, world with TLS\r\n")) }),
//!     )?;
//!     server.init()?;
//!     server.run()?;
//!     std::thread::park();
//!     server.stop()
//! }
//! ```
//!
//! # Architecture
//!
//! - [`server`] - `Http2Server` lifecycle (Init/Run/Stop) and hyper transport
//! - [`coordinator`] - two-leg request lifecycle and cleanup races
//! - [`active_requests`] - concurrent table of in-flight requests
//! - [`http`] - request/response types and the handler registry
//! - [`authorization`], [`executor`], [`metrics`] - pluggable collaborators
//! - [`tls`] - server-side TLS context from PEM files
//! - [`config`] / [`logging`] - TOML + env configuration and `env_logger` setup

pub mod active_requests;
pub mod authorization;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod tls;

#[cfg(test)]
pub(crate) mod testing;

pub use authorization::{
    AuthorizationProxy, AuthorizationRequest, AuthorizationResponse, PassThroughAuthorizationProxy,
};
pub use config::PortcullisConfig;
pub use context::AsyncContext;
pub use coordinator::{Leg, RequestCoordinator};
pub use error::{ExecutionResult, Result, ServerError};
pub use executor::{AsyncExecutor, TokioAsyncExecutor};
pub use metrics::MetricClient;
pub use server::{Http2Server, Http2ServerBuilder, ServerState};
