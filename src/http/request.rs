//! Request ID assignment.
//!
//! # Responsibilities
//! - Generate a UUID v4 `x-request-id` when the caller sent none
//! - Echo the request ID on the response
//!
//! # Design Decisions
//! - Request ID added as early as possible so trace spans carry it
//! - Caller-supplied IDs are kept unchanged

use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

/// Header name used for request correlation.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Layers that set (outer) and propagate (inner) the request ID.
pub fn request_id_layers() -> (SetRequestIdLayer<UuidRequestId>, PropagateRequestIdLayer) {
    (
        SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId),
        PropagateRequestIdLayer::new(X_REQUEST_ID),
    )
}
