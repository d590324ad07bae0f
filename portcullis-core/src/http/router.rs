//! Exact (method, path) routing to resource handlers
//!
//! Registration is insert-only: a second registration for the same pair is
//! rejected and the first handler stays in place. Lookups run on every request
//! and never observe a partially written entry.

use futures::future::BoxFuture;
use http::Method;
use scc::HashMap as SccHashMap;
use std::future::Future;
use std::sync::Arc;

use super::{HttpRequest, HttpResponse};
use crate::error::{Result, ServerError};

/// Async resource handler
pub type HttpHandler =
    Arc<dyn Fn(HttpRequest) -> BoxFuture<'static, Result<HttpResponse>> + Send + Sync>;

/// Wrap an async closure into an [`HttpHandler`]
pub fn handler_fn<F, Fut>(f: F) -> HttpHandler
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

/// Thread-safe (method, path) → handler registry
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: SccHashMap<(Method, String), HttpHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self { handlers: SccHashMap::new() }
    }

    /// Register a handler; fails with `HandlerAlreadyExists` if the pair is taken
    pub fn register(&self, method: Method, path: impl Into<String>, handler: HttpHandler) -> Result<()> {
        let path = path.into();
        match self.handlers.insert_sync((method, path), handler) {
            Ok(()) => Ok(()),
            Err(((method, path), _rejected)) => {
                log::warn!("Handler already registered for {} {}", method, path);
                Err(ServerError::HandlerAlreadyExists { method, path })
            }
        }
    }

    /// Find the handler for an exact (method, path) pair
    pub fn lookup(&self, method: &Method, path: &str) -> Option<HttpHandler> {
        self.handlers.read_sync(&(method.clone(), path.to_string()), |_, handler| handler.clone())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
