//! Shared-secret gate for `/proxy`.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::http::error::ProxyError;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Header carrying the caller's copy of the shared secret.
pub const X_PROXY_SECRET: &str = "x-proxy-secret";

/// `true` when `headers` carry exactly the configured secret.
///
/// An unconfigured secret rejects everything.
pub fn is_authorized(secret: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(secret) = secret else {
        return false;
    };

    headers
        .get(X_PROXY_SECRET)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|provided| provided == secret)
}

/// Reject the request with 401 unless it carries the shared secret.
///
/// Runs before the body is read.
pub async fn require_proxy_secret(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_authorized(state.secret.as_deref(), request.headers()) {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Rejected request with missing or invalid proxy secret");
    let err = ProxyError::Unauthorized;
    metrics::record_rejection(err.outcome(), err.status().as_u16());
    err.into_response()
}
