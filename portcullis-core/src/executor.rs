//! Async executor collaborator
//!
//! The coordinator never manages threads itself: authorization, handler and
//! body-collection work is handed to an [`AsyncExecutor`] and runs with no
//! ordering guarantee relative to other submissions.

use futures::future::BoxFuture;
use tokio::runtime::{Handle, Runtime};

use crate::error::{ExecutionResult, Result, ServerError};

/// Fire-and-continue task submission
pub trait AsyncExecutor: Send + Sync {
    /// Schedule `task`; on error the task has already been dropped
    fn schedule(&self, task: BoxFuture<'static, ()>) -> ExecutionResult;
}

/// Tokio-backed executor, either owning its runtime or borrowing a handle
pub struct TokioAsyncExecutor {
    handle: Handle,
    runtime: Option<Runtime>,
}

impl TokioAsyncExecutor {
    /// Own a dedicated multi-thread runtime with `worker_threads` workers
    pub fn new(worker_threads: usize) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("portcullis-exec")
            .enable_all()
            .build()
            .map_err(|e| ServerError::ExecutorUnavailable(e.to_string()))?;
        Ok(Self { handle: runtime.handle().clone(), runtime: Some(runtime) })
    }

    /// Spawn onto an existing runtime
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle, runtime: None }
    }

    /// Use the runtime the caller is currently running on
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|e| ServerError::ExecutorUnavailable(e.to_string()))
    }
}

impl AsyncExecutor for TokioAsyncExecutor {
    fn schedule(&self, task: BoxFuture<'static, ()>) -> ExecutionResult {
        self.handle.spawn(task);
        Ok(())
    }
}

impl Drop for TokioAsyncExecutor {
    fn drop(&mut self) {
        // Blocking shutdown would panic inside an async context
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
