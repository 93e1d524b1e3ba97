//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, body limit, request ID, proxy secret)
//! - Build the mTLS context once and inject it into handler state
//! - Bind server to listener and drain on shutdown

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::auth::require_proxy_secret;
use crate::http::envelope::HealthStatus;
use crate::http::proxy::proxy_handler;
use crate::http::request::request_id_layers;
use crate::observability::metrics;
use crate::tls::MtlsContext;

/// Application state injected into handlers.
///
/// Immutable after startup; shared by reference across all requests.
#[derive(Debug)]
pub struct AppState {
    /// Shared secret required on `/proxy`.
    pub secret: Option<String>,

    /// Client context for upstream calls; `None` when mTLS is unavailable.
    pub mtls: Option<MtlsContext>,
}

impl AppState {
    /// Build state from configuration, constructing the mTLS context.
    pub fn from_config(config: &ProxyConfig) -> Self {
        if config.auth.secret.is_none() {
            tracing::warn!("Proxy secret not configured, /proxy will reject every request");
        }

        let mtls = MtlsContext::from_config(&config.mtls, &config.timeouts);
        metrics::record_mtls_state(mtls.is_some());

        Self {
            secret: config.auth.secret.clone(),
            mtls,
        }
    }

    pub fn mtls_enabled(&self) -> bool {
        self.mtls.is_some()
    }
}

/// HTTP server for the mTLS proxy.
pub struct HttpServer {
    router: Router,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let state = Arc::new(AppState::from_config(&config));
        let router = build_router(&config, state.clone());
        Self { router, state }
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mtls = self.state.mtls_enabled(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Router with all layers, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(config: &ProxyConfig, state: Arc<AppState>) -> Router {
    let (set_request_id, propagate_request_id) = request_id_layers();

    let proxy_routes = Router::new()
        .route("/proxy", post(proxy_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_proxy_secret,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .merge(proxy_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(set_request_id)
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id)
                .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes)),
        )
}

/// `GET /health`: liveness plus whether the mTLS context exists.
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        mtls: state.mtls_enabled(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
