//! Builder pattern for Http2Server

use std::sync::Arc;

use super::Http2Server;
use crate::authorization::{AuthorizationProxy, PassThroughAuthorizationProxy};
use crate::config::PortcullisConfig;
use crate::coordinator::RequestCoordinator;
use crate::error::Result;
use crate::executor::{AsyncExecutor, TokioAsyncExecutor};
use crate::metrics::MetricClient;

/// Builder for [`Http2Server`]
///
/// Starts from [`PortcullisConfig::load`]; every `with_*` call overrides what
/// the file and environment provided.
pub struct Http2ServerBuilder {
    config: PortcullisConfig,
    executor: Option<Arc<dyn AsyncExecutor>>,
    authorization_proxy: Option<Arc<dyn AuthorizationProxy>>,
    metric_client: Option<Arc<dyn MetricClient>>,
}

impl Default for Http2ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Http2ServerBuilder {
    /// Create a new builder with file and environment configuration applied
    pub fn new() -> Self {
        let config = PortcullisConfig::load().unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable configuration, using defaults: {:#}", e);
            PortcullisConfig::default()
        });
        Self { config, executor: None, authorization_proxy: None, metric_client: None }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: PortcullisConfig) -> Self {
        self.config = config;
        self
    }

    // ========================================================================
    // SERVER CONFIGURATION
    // ========================================================================

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    /// Set server port; 0 binds an ephemeral port
    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_thread_pool_size(mut self, threads: usize) -> Self {
        self.config.server.thread_pool_size = threads;
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.config.server.max_body_size = size;
        self
    }

    pub fn with_shutdown_grace_ms(mut self, grace_ms: u64) -> Self {
        self.config.server.shutdown_grace_ms = grace_ms;
        self
    }

    /// Enable TLS with a PEM private key and certificate chain
    pub fn with_tls(mut self, private_key_path: impl Into<String>, cert_chain_path: impl Into<String>) -> Self {
        self.config.server.tls_enabled = true;
        self.config.server.tls_private_key_path = Some(private_key_path.into());
        self.config.server.tls_cert_chain_path = Some(cert_chain_path.into());
        self
    }

    // ========================================================================
    // COLLABORATORS
    // ========================================================================

    pub fn with_executor(mut self, executor: Arc<dyn AsyncExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_authorization_proxy(mut self, proxy: Arc<dyn AuthorizationProxy>) -> Self {
        self.authorization_proxy = Some(proxy);
        self
    }

    pub fn with_metric_client(mut self, metric_client: Arc<dyn MetricClient>) -> Self {
        self.metric_client = Some(metric_client);
        self
    }

    pub fn build(self) -> Result<Http2Server> {
        self.config.validate()?;
        let server_config = self.config.server;

        let executor: Arc<dyn AsyncExecutor> = match self.executor {
            Some(executor) => executor,
            None => Arc::new(TokioAsyncExecutor::new(server_config.thread_pool_size)?),
        };
        let authorization_proxy: Arc<dyn AuthorizationProxy> = match self.authorization_proxy {
            Some(proxy) => proxy,
            None => Arc::new(PassThroughAuthorizationProxy),
        };

        log::debug!(
            "Building server for {} (metrics {})",
            server_config.address(),
            if self.metric_client.is_some() { "enabled" } else { "disabled" }
        );
        let coordinator = Arc::new(RequestCoordinator::new(
            executor,
            authorization_proxy,
            self.metric_client,
            server_config.max_body_size,
        ));
        Ok(Http2Server::from_parts(server_config, coordinator))
    }
}
