//! Access-control HTTP proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id / trace
//!                     → method block     (405)
//!                     → client domain    (403)
//!                     → request log
//!                     → rate limit       (429)
//!                     → /health, /config, ... (answered locally)
//!                       or forwarding engine ──────▶ Upstream
//!     Client Response                                (502 on failure)
//!     ◀──────────────────────────────────────────────
//! ```
//!
//! Startup order: flags, config file, logging, validation, metrics,
//! policy, listener. Any startup error is fatal.

use clap::Parser;
use tokio::net::TcpListener;

use access_proxy::config::loader::{read_config, read_config_or_default};
use access_proxy::config::validation::validate_config;
use access_proxy::config::{ConfigError, Flags};
use access_proxy::observability::{logging, metrics};
use access_proxy::{HttpServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let flags = Flags::parse();

    let (file_config, found) = if flags.uses_default_config() {
        read_config_or_default(&flags.config)?
    } else {
        (read_config(&flags.config)?, true)
    };
    let config = flags.apply(file_config);

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "access-proxy starting");

    if !found {
        tracing::warn!(
            path = %flags.config.display(),
            "Config file not found, using defaults and flags"
        );
    }

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(field = error.field, reason = %error.message, "Invalid configuration");
        }
        return Err(ConfigError::Validation(errors).into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.target,
        allowed_domains = ?config.access.allowed_domains,
        blocked_methods = ?config.access.blocked_methods,
        requests_per_window = config.rate_limit.requests_per_window,
        log_requests = config.observability.log_requests,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()?;
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
