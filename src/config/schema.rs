//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.
//! Secrets and credential material are redacted from `Debug` output.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::tls::pem::RSA_PRIVATE_KEY_LABEL;

/// Root configuration for the mTLS proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind host, port).
    pub listener: ListenerConfig,

    /// Inbound shared-secret authentication.
    pub auth: AuthConfig,

    /// Client credentials presented to the upstream.
    pub mtls: MtlsConfig,

    /// Outbound timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or IP to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// TCP port to listen on.
    pub port: u16,
}

impl ListenerConfig {
    /// Address string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Shared-secret authentication for `/proxy`.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value callers must send in `x-proxy-secret`. `None` locks `/proxy`.
    pub secret: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &redacted(&self.secret))
            .finish()
    }
}

/// Client certificate material for the upstream connection.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MtlsConfig {
    /// Client certificate, PEM or loosely formatted base64.
    pub certificate: Option<String>,

    /// Client private key, PEM or loosely formatted base64.
    pub private_key: Option<String>,

    /// PEM label applied to the private key when it is rebuilt.
    pub key_label: String,

    /// Extra CA certificates (PEM file) trusted for upstream servers.
    pub ca_bundle_path: Option<PathBuf>,
}

impl Default for MtlsConfig {
    fn default() -> Self {
        Self {
            certificate: None,
            private_key: None,
            key_label: RSA_PRIVATE_KEY_LABEL.to_string(),
            ca_bundle_path: None,
        }
    }
}

impl fmt::Debug for MtlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MtlsConfig")
            .field("certificate", &redacted(&self.certificate))
            .field("private_key", &redacted(&self.private_key))
            .field("key_label", &self.key_label)
            .field("ca_bundle_path", &self.ca_bundle_path)
            .finish()
    }
}

/// Timeouts applied to outbound calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment (TCP + TLS) timeout in seconds.
    pub connect_secs: u64,

    /// Total time for the upstream request/response in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 30,
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl ObservabilityConfig {
    pub fn metrics_socket_addr(&self) -> Option<SocketAddr> {
        self.metrics_address.parse().ok()
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

fn redacted(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}
