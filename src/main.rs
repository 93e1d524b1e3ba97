//! mTLS forwarding proxy (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌───────────────────────────────────────────────┐
//!                       │                  MTLS PROXY                   │
//!                       │                                               │
//!   POST /proxy         │  ┌──────────┐   ┌──────────┐   ┌───────────┐  │
//!   ────────────────────┼─▶│   http   │──▶│   auth   │──▶│   proxy   │──┼──▶ Upstream
//!                       │  │  server  │   │ (secret) │   │ (reqwest) │  │    (mTLS)
//!   JSON envelope       │  └──────────┘   └──────────┘   └─────┬─────┘  │
//!   ◀───────────────────┼────────────────────────────────────────┘      │
//!                       │                                               │
//!                       │  ┌─────────────────────────────────────────┐  │
//!                       │  │  config → tls::pem → tls::context       │  │
//!                       │  │  (built once at startup, read-only)     │  │
//!                       │  └─────────────────────────────────────────┘  │
//!                       └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use mtls_proxy::config::load_config;
use mtls_proxy::lifecycle;
use mtls_proxy::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "mtls-proxy", version)]
#[command(about = "Forward authenticated requests to an upstream over mutual TLS", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port (overrides config file and PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }

    init_logging(&config.observability.log_level);
    tracing::info!("mtls-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        secret_configured = config.auth.secret.is_some(),
        certificate_configured = config.mtls.certificate.is_some(),
        private_key_configured = config.mtls.private_key.is_some(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    match lifecycle::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Proxy terminated");
            ExitCode::FAILURE
        }
    }
}
