//! Optional metric collaborator
//!
//! The server works identically with no metric client configured.

use http::Method;
use std::time::Duration;

use crate::error::ExecutionResult;

/// Receives per-request signals
pub trait MetricClient: Send + Sync {
    fn on_request_received(&self, method: &Method, path: &str);

    fn on_request_completed(
        &self,
        method: &Method,
        path: &str,
        result: &ExecutionResult,
        latency: Duration,
    );
}
