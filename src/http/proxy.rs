//! Forwarding gateway.
//!
//! # Request States
//! ```text
//! Unauthenticated ──(auth.rs)──▶ Authenticated ──▶ Dispatched ──▶ Completed
//!        │                            │                 │
//!        ▼                            ▼                 ▼
//!       401                      400 / 500             500
//! ```
//!
//! # Design Decisions
//! - Upstream 4xx/5xx are relayed as-is; they are results, not failures
//! - Transport failures are reported once with their message, never retried
//! - The upstream body is relayed byte-for-byte as text

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use url::Url;

use crate::http::envelope::{ProxyRequest, ProxyResponse};
use crate::http::error::ProxyError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::tls::MtlsContext;

/// `POST /proxy` handler. Authentication has already passed.
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProxyResponse>), ProxyError> {
    let start_time = Instant::now();

    let result = forward(&state, payload).await;
    match &result {
        Ok((status, _)) => metrics::record_request("completed", status.as_u16(), start_time),
        Err(e) => metrics::record_request(e.outcome(), e.status().as_u16(), start_time),
    }
    result
}

async fn forward(
    state: &AppState,
    payload: Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProxyResponse>), ProxyError> {
    let request = match payload {
        Ok(Json(request)) => request,
        // No JSON content type: nothing was sent, so there is no URL either.
        Err(JsonRejection::MissingJsonContentType(_)) => ProxyRequest::default(),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(ProxyError::PayloadTooLarge)
        }
        Err(rejection) => return Err(ProxyError::BadRequest(rejection.body_text())),
    };

    let target = request
        .target_url()
        .ok_or_else(|| ProxyError::BadRequest("URL is required".to_string()))?;

    let context = state.mtls.as_ref().ok_or(ProxyError::ServiceUnavailable)?;

    let method = request.method();
    tracing::info!(method = %method, url = %target, "Forwarding request");

    match dispatch(context, &request, &method, target).await {
        Ok(response) => {
            tracing::info!(status = response.status, url = %target, "Upstream responded");
            let status = StatusCode::from_u16(response.status)
                .map_err(|e| ProxyError::Upstream(e.to_string()))?;
            Ok((status, Json(response)))
        }
        Err(e) => {
            tracing::error!(error = %e, url = %target, "Upstream request failed");
            Err(e)
        }
    }
}

/// Issue the outbound call over the mTLS client and collect the response.
async fn dispatch(
    context: &MtlsContext,
    request: &ProxyRequest,
    method: &str,
    target: &str,
) -> Result<ProxyResponse, ProxyError> {
    let url = Url::parse(target)
        .map_err(|e| ProxyError::Upstream(format!("Failed to parse URL from {target}: {e}")))?;
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|e| ProxyError::Upstream(format!("Invalid method {method}: {e}")))?;
    let headers = outbound_headers(request.headers.as_ref())?;

    let mut outbound = context.client().request(method, url).headers(headers);
    if let Some(body) = request.outbound_body() {
        outbound = outbound.body(body);
    }

    let response = outbound.send().await?;
    let status = response.status().as_u16();
    let headers = flatten_headers(response.headers());
    let body = response.bytes().await?;

    Ok(ProxyResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Default JSON content type, overridden by any caller header of the same
/// name (case-insensitive).
fn outbound_headers(
    caller: Option<&HashMap<String, String>>,
) -> Result<HeaderMap, ProxyError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in caller.into_iter().flatten() {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProxyError::Upstream(format!("Invalid header name {name:?}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ProxyError::Upstream(format!("Invalid value for header {name:?}: {e}")))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

/// Collapse a header map into name → value, joining repeats with `", "`.
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flattened: BTreeMap<String, String> = BTreeMap::new();

    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        flattened
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }

    flattened
}
