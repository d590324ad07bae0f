//! Error taxonomy for the serving core
//!
//! Lifecycle errors come back synchronously from `init`/`run`/`stop`.
//! Per-request errors only ever travel through a request's completion callback.

use http::{Method, StatusCode};

use crate::http::RequestId;

/// Outcome of one unit of work: a request leg, a lifecycle call, a scheduling attempt
pub type ExecutionResult = std::result::Result<(), ServerError>;

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, ServerError>;

/// Main error type for the serving core
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    #[error("HTTP/2 server is already running")]
    AlreadyRunning,
    #[error("HTTP/2 server is already stopped")]
    AlreadyStopped,
    #[error("Failed to initialize TLS context: {0}")]
    TlsInitFailed(String),
    #[error("Handler already registered for {method} {path}")]
    HandlerAlreadyExists { method: Method, path: String },
    /// Active-request lookup miss. Usually a benign race with finalization.
    #[error("Request {0} is not active")]
    RequestNotFound(RequestId),
    #[error("Request {0} is already active")]
    RequestAlreadyExists(RequestId),
    /// Opaque code from the authorization collaborator
    #[error("Authorization failed with code {0}")]
    AuthorizationFailed(u64),
    /// Opaque code from a resource handler
    #[error("Handler failed with code {0}")]
    HandlerFailed(u64),
    /// Transient failure propagated from a dependency; never produced by the core itself
    #[error("Transient failure with code {0}, retry later")]
    Retry(u64),
    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
    #[error("Failed to read request body: {0}")]
    BodyReadFailed(String),
    #[error("Request aborted by transport (reason code {0:#x})")]
    RequestAborted(u32),
    #[error("Request context dropped before completion")]
    ContextAbandoned,
    #[error("Executor rejected task: {0}")]
    ExecutorUnavailable(String),
    #[error("Transport error: {0}")]
    TransportFailed(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ServerError {
    /// HTTP status written back when a request completes with this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::AuthorizationFailed(_) => StatusCode::FORBIDDEN,
            ServerError::Retry(_) | ServerError::ExecutorUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServerError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::BodyReadFailed(_) => StatusCode::BAD_REQUEST,
            ServerError::RequestNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Snake-case code used in JSON error bodies
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::AlreadyRunning => "already_running",
            ServerError::AlreadyStopped => "already_stopped",
            ServerError::TlsInitFailed(_) => "tls_init_failed",
            ServerError::HandlerAlreadyExists { .. } => "handler_already_exists",
            ServerError::RequestNotFound(_) => "request_not_found",
            ServerError::RequestAlreadyExists(_) => "request_already_exists",
            ServerError::AuthorizationFailed(_) => "authorization_failed",
            ServerError::HandlerFailed(_) => "handler_failed",
            ServerError::Retry(_) => "retry",
            ServerError::BodyTooLarge { .. } => "body_too_large",
            ServerError::BodyReadFailed(_) => "body_read_failed",
            ServerError::RequestAborted(_) => "request_aborted",
            ServerError::ContextAbandoned => "context_abandoned",
            ServerError::ExecutorUnavailable(_) => "executor_unavailable",
            ServerError::TransportFailed(_) => "transport_failed",
            ServerError::InvalidConfig(_) => "invalid_config",
        }
    }

    /// Whether a client may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServerError::Retry(_) | ServerError::ExecutorUnavailable(_))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::InvalidConfig(format!("{:#}", err))
    }
}
