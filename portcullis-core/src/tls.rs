//! Server-side TLS context assembly
//!
//! Loads a PEM private key and a PEM certificate chain and produces a
//! [`TlsAcceptor`] advertising `h2` then `http/1.1` over ALPN. Every failure,
//! whichever file is at fault, surfaces as [`ServerError::TlsInitFailed`].

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

use crate::error::{Result, ServerError};

/// ALPN protocols offered to clients, most preferred first
pub const ALPN_PROTOCOLS: [&[u8]; 2] = [b"h2", b"http/1.1"];

#[derive(Debug, Clone)]
pub struct TlsContextBuilder {
    private_key_path: PathBuf,
    certificate_chain_path: PathBuf,
}

impl TlsContextBuilder {
    pub fn new(private_key_path: impl Into<PathBuf>, certificate_chain_path: impl Into<PathBuf>) -> Self {
        Self {
            private_key_path: private_key_path.into(),
            certificate_chain_path: certificate_chain_path.into(),
        }
    }

    pub fn build(&self) -> Result<TlsAcceptor> {
        self.assemble().map_err(|reason| {
            log::error!("TLS initialization failed: {}", reason);
            ServerError::TlsInitFailed(reason)
        })
    }

    fn assemble(&self) -> std::result::Result<TlsAcceptor, String> {
        let certs = load_certificates(&self.certificate_chain_path)?;
        let key = load_private_key(&self.private_key_path)?;

        // Pin the provider; a process may link more than one
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| format!("Unsupported protocol versions: {}", e))?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| format!("Invalid certificate or key: {}", e))?;
        config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();

        log::debug!(
            "TLS context built from key {} and chain {}",
            self.private_key_path.display(),
            self.certificate_chain_path.display()
        );
        Ok(TlsAcceptor::from(Arc::new(config)))
    }
}

fn open(path: &Path, what: &str) -> std::result::Result<BufReader<File>, String> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| format!("Failed to open {} file {}: {}", what, path.display(), e))
}

fn load_certificates(path: &Path) -> std::result::Result<Vec<CertificateDer<'static>>, String> {
    let mut reader = open(path, "certificate chain")?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("Failed to parse certificate chain {}: {}", path.display(), e))?;
    if certs.is_empty() {
        return Err(format!("No certificates found in {}", path.display()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> std::result::Result<PrivateKeyDer<'static>, String> {
    let mut reader = open(path, "private key")?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| format!("Failed to parse private key {}: {}", path.display(), e))?
        .ok_or_else(|| format!("No private key found in {}", path.display()))
}
