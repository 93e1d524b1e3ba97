//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers: request ID, trace, body limit)
//!     → GET /health → server.rs (status + mTLS flag)
//!     → POST /proxy
//!         → auth.rs (x-proxy-secret check)
//!         → proxy.rs (validate envelope, dispatch over mTLS, relay)
//!         → envelope.rs (JSON in/out)
//!     → error.rs (failures as {"error": ...})
//! ```

pub mod auth;
pub mod envelope;
pub mod error;
pub mod proxy;
pub mod request;
pub mod server;

pub use envelope::{HealthStatus, ProxyRequest, ProxyResponse};
pub use error::ProxyError;
pub use request::X_REQUEST_ID;
pub use server::{build_router, AppState, HttpServer};
