//! Client credential subsystem.
//!
//! # Data Flow
//! ```text
//! raw certificate / key strings (config, env)
//!     → pem.rs (normalize into strict PEM blocks)
//!     → context.rs (parse, build rustls client config + reqwest client)
//!     → MtlsContext (immutable, shared by every forwarded call)
//! ```
//!
//! # Design Decisions
//! - Context is built exactly once per process
//! - Construction failures leave the proxy running without mTLS
//! - Upstream certificate verification is always on

pub mod context;
pub mod pem;

pub use context::{MtlsContext, MtlsError};
pub use pem::{normalize, PemError};
