//! mTLS client context construction.
//!
//! # Responsibilities
//! - Normalize the configured certificate and private key
//! - Build a rustls client config that presents them on every handshake
//! - Verify upstream servers against the platform roots (plus an optional
//!   CA bundle), with no way to switch verification off
//! - Wrap the result in a reqwest client shared by all forwarded calls
//!
//! # Design Decisions
//! - Built once at startup and never rebuilt; rotating credentials needs a
//!   restart
//! - Missing or broken credentials degrade the proxy instead of aborting it;
//!   see [`MtlsContext::from_config`]

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use thiserror::Error;

use crate::config::{MtlsConfig, TimeoutConfig};
use crate::tls::pem::{self, PemError, CERTIFICATE_LABEL};

/// Reasons the mTLS context could not be built.
#[derive(Debug, Error)]
pub enum MtlsError {
    #[error("{0} not configured")]
    ConfigurationMissing(&'static str),

    #[error(transparent)]
    InvalidInput(#[from] PemError),

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("no {0} found in PEM input")]
    Empty(&'static str),

    #[error("failed to read CA bundle {path}: {source}")]
    CaBundle {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS configuration rejected: {0}")]
    Tls(#[from] rustls::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Immutable client context used for every forwarded call.
///
/// Cloning is cheap: the underlying reqwest client is reference counted.
#[derive(Clone, Debug)]
pub struct MtlsContext {
    client: reqwest::Client,
}

impl MtlsContext {
    /// Build the context from raw credential strings.
    pub fn build(
        certificate: &str,
        private_key: &str,
        config: &MtlsConfig,
        timeouts: &TimeoutConfig,
    ) -> Result<Self, MtlsError> {
        if certificate.is_empty() {
            return Err(MtlsError::ConfigurationMissing("client certificate"));
        }
        if private_key.is_empty() {
            return Err(MtlsError::ConfigurationMissing("client private key"));
        }

        let cert_pem = pem::normalize(certificate, CERTIFICATE_LABEL)?;
        let key_pem = pem::normalize(private_key, &config.key_label)?;

        let certs = parse_certificates(&cert_pem)?;
        let key = parse_private_key(&key_pem)?;
        let roots = load_root_store(config.ca_bundle_path.as_deref())?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let tls = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_client_auth_cert(certs, key)?;

        let client = reqwest::Client::builder()
            .use_preconfigured_tls(tls)
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .no_proxy()
            .build()?;

        Ok(Self { client })
    }

    /// Build the context from configuration, logging instead of failing.
    ///
    /// Returns `None` when either credential is missing or construction
    /// fails; the proxy keeps serving `/health` in that case.
    pub fn from_config(config: &MtlsConfig, timeouts: &TimeoutConfig) -> Option<Self> {
        let (Some(certificate), Some(private_key)) =
            (config.certificate.as_deref(), config.private_key.as_deref())
        else {
            tracing::warn!("Client certificate or private key not configured, mTLS disabled");
            return None;
        };

        match Self::build(certificate, private_key, config, timeouts) {
            Ok(context) => {
                tracing::info!("mTLS client context created");
                Some(context)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create mTLS client context");
                None
            }
        }
    }

    /// HTTP client carrying the client certificate.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

fn parse_certificates(pem: &str) -> Result<Vec<CertificateDer<'static>>, MtlsError> {
    let certs = rustls_pemfile::certs(&mut pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| MtlsError::Decode {
            what: "client certificate",
            source,
        })?;

    if certs.is_empty() {
        return Err(MtlsError::Empty("certificate"));
    }
    Ok(certs)
}

fn parse_private_key(pem: &str) -> Result<PrivateKeyDer<'static>, MtlsError> {
    rustls_pemfile::private_key(&mut pem.as_bytes())
        .map_err(|source| MtlsError::Decode {
            what: "client private key",
            source,
        })?
        .ok_or(MtlsError::Empty("private key"))
}

fn load_root_store(ca_bundle: Option<&Path>) -> Result<RootCertStore, MtlsError> {
    let mut roots = RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        tracing::debug!(error = %e, "Skipping unreadable native certificate source");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    tracing::debug!(added, ignored, "Loaded native root certificates");

    if let Some(path) = ca_bundle {
        let file = File::open(path).map_err(|source| MtlsError::CaBundle {
            path: path.display().to_string(),
            source,
        })?;
        let extra = rustls_pemfile::certs(&mut BufReader::new(file))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| MtlsError::CaBundle {
                path: path.display().to_string(),
                source,
            })?;
        for cert in extra {
            roots.add(cert)?;
        }
    }

    if roots.is_empty() {
        tracing::warn!("No trusted root certificates loaded; HTTPS upstreams will fail verification");
    }
    Ok(roots)
}
