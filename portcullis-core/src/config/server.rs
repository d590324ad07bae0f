//! Server configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening address
    /// Env: PORTCULLIS_HOST
    /// Default: "127.0.0.1"
    pub host: String,

    /// Listening port; 0 asks the OS for a free one
    /// Env: PORTCULLIS_PORT
    /// Default: 8080
    pub port: u16,

    /// Transport I/O worker threads (also sizes the default executor)
    /// Env: PORTCULLIS_THREADS
    /// Default: 2
    pub thread_pool_size: usize,

    /// Serve over TLS
    /// Env: PORTCULLIS_TLS_ENABLED
    /// Default: false
    pub tls_enabled: bool,

    /// Path to the PEM private key
    /// Env: PORTCULLIS_TLS_KEY
    pub tls_private_key_path: Option<String>,

    /// Path to the PEM certificate chain
    /// Env: PORTCULLIS_TLS_CERT
    pub tls_cert_chain_path: Option<String>,

    /// Maximum request body size in bytes
    /// Env: PORTCULLIS_MAX_BODY_SIZE
    /// Default: 10485760 (10MB)
    pub max_body_size: usize,

    /// How long Stop() waits for in-flight connections, in milliseconds
    /// Default: 5000
    pub shutdown_grace_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            thread_pool_size: 2,
            tls_enabled: false,
            tls_private_key_path: None,
            tls_cert_chain_path: None,
            max_body_size: 10 * 1024 * 1024, // 10MB
            shutdown_grace_ms: 5000,
        }
    }
}

impl ServerConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.host = other.host;
        self.port = other.port;
        self.thread_pool_size = other.thread_pool_size;
        self.tls_enabled = other.tls_enabled;
        self.tls_private_key_path = other.tls_private_key_path.or(self.tls_private_key_path.take());
        self.tls_cert_chain_path = other.tls_cert_chain_path.or(self.tls_cert_chain_path.take());
        self.max_body_size = other.max_body_size;
        self.shutdown_grace_ms = other.shutdown_grace_ms;
    }

    /// Apply environment variables
    pub fn apply_env_vars(&mut self) {
        if let Ok(host) = env::var("PORTCULLIS_HOST") {
            self.host = host;
        }

        if let Ok(port) = env::var("PORTCULLIS_PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        if let Ok(threads) = env::var("PORTCULLIS_THREADS") {
            if let Ok(t) = threads.parse() {
                self.thread_pool_size = t;
            }
        }

        if let Ok(enabled) = env::var("PORTCULLIS_TLS_ENABLED") {
            self.tls_enabled = enabled.parse().unwrap_or(false);
        }

        if let Ok(key) = env::var("PORTCULLIS_TLS_KEY") {
            self.tls_private_key_path = Some(key);
        }

        if let Ok(cert) = env::var("PORTCULLIS_TLS_CERT") {
            self.tls_cert_chain_path = Some(cert);
        }

        if let Ok(size) = env::var("PORTCULLIS_MAX_BODY_SIZE") {
            if let Ok(s) = size.parse() {
                self.max_body_size = s;
            }
        }
    }

    /// Validate configuration
    ///
    /// TLS file existence is left to `Init()`, which reports it as a TLS failure.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            bail!("Invalid host: host cannot be empty");
        }

        if self.thread_pool_size == 0 {
            bail!("Invalid thread_pool_size: must be at least 1");
        }

        if self.max_body_size == 0 {
            bail!("Invalid max_body_size: must be greater than 0");
        }

        if self.tls_enabled {
            if self.tls_private_key_path.is_none() {
                bail!("TLS is enabled but PORTCULLIS_TLS_KEY is missing");
            }
            if self.tls_cert_chain_path.is_none() {
                bail!("TLS is enabled but PORTCULLIS_TLS_CERT is missing");
            }
        }

        Ok(())
    }

    /// `host:port` as given, before any port-0 resolution
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
