//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use mtls_proxy::config::ProxyConfig;
use mtls_proxy::http::HttpServer;
use mtls_proxy::lifecycle::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use tokio::net::TcpListener;

/// Client credentials issued by the test CA.
pub const CLIENT_CERT: &str = include_str!("../fixtures/client.crt");
pub const CLIENT_KEY: &str = include_str!("../fixtures/client.key");

/// Self-signed client credentials the test CA knows nothing about.
pub const UNTRUSTED_CLIENT_CERT: &str = include_str!("../fixtures/untrusted-client.crt");
pub const UNTRUSTED_CLIENT_KEY: &str = include_str!("../fixtures/untrusted-client.key");

pub const CA_CERT: &str = include_str!("../fixtures/ca.crt");
pub const SERVER_CERT: &str = include_str!("../fixtures/server.crt");
pub const SERVER_KEY: &str = include_str!("../fixtures/server.key");

pub const SECRET: &str = "test-secret";

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Config with the shared secret and valid client credentials.
pub fn mtls_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_host = "127.0.0.1".into();
    config.auth.secret = Some(SECRET.into());
    config.mtls.certificate = Some(CLIENT_CERT.into());
    config.mtls.private_key = Some(CLIENT_KEY.into());
    config.timeouts.connect_secs = 2;
    config.timeouts.request_secs = 5;
    config
}

/// Serve `router` as a mock upstream on an ephemeral port.
pub async fn start_upstream(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Serve `router` over HTTPS on an ephemeral port, requiring a client
/// certificate issued by the test CA.
///
/// The server certificate is valid for `127.0.0.1` and `localhost`.
pub async fn start_mtls_upstream(router: Router) -> SocketAddr {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut client_roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut CA_CERT.as_bytes()) {
        client_roots.add(cert.unwrap()).unwrap();
    }
    let verifier =
        WebPkiClientVerifier::builder_with_provider(Arc::new(client_roots), provider.clone())
            .build()
            .unwrap();

    let certs = rustls_pemfile::certs(&mut SERVER_CERT.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key = rustls_pemfile::private_key(&mut SERVER_KEY.as_bytes())
        .unwrap()
        .unwrap();

    let server_config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)
        .unwrap();

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let tls = RustlsConfig::from_config(Arc::new(server_config));
    tokio::spawn(async move {
        let _ = axum_server::from_tcp_rustls(listener, tls)
            .serve(router.into_make_service())
            .await;
    });

    addr
}

/// Start a backend that answers every connection with `response` verbatim.
///
/// Useful when the exact bytes on the wire matter (repeated headers, odd
/// body formatting).
pub async fn start_raw_backend(response: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let response = response.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Run the proxy on an ephemeral port until the returned handle triggers.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}
