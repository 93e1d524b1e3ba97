//! mTLS forwarding proxy library.
//!
//! Accepts JSON-described requests on `POST /proxy`, authenticates them with
//! a shared secret, and replays them against an upstream over a TLS
//! connection that presents a client certificate.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod tls;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use tls::MtlsContext;
