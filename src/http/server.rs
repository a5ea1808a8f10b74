//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the admission pipeline from the validated config
//! - Wrap it with request-id and tracing layers
//! - Serve with connect info so gates can see the peer address
//! - Sweep idle rate-limit windows in the background
//! - Drain gracefully on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::forward::{ForwardingEngine, UpstreamForwarder};
use super::pipeline::PipelineBuilder;
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::observability::metrics;
use crate::policy::AccessPolicy;
use crate::security::RateLimiter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<AccessPolicy>,
    pub limiter: Option<Arc<RateLimiter>>,
    pub forwarder: Arc<dyn ForwardingEngine>,
}

/// HTTP server for the access proxy.
pub struct HttpServer {
    router: Router,
    limiter: Option<Arc<RateLimiter>>,
    sweep_interval: Option<Duration>,
}

impl HttpServer {
    /// Create a server forwarding to the configured upstream.
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let policy = AccessPolicy::from_config(config)?;
        let forwarder = Arc::new(UpstreamForwarder::from_policy(&policy));
        let sweep_interval = match config.rate_limit.sweep_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Ok(Self::with_forwarder(policy, forwarder, sweep_interval))
    }

    /// Create a server around an arbitrary forwarding engine.
    pub fn with_forwarder(
        policy: AccessPolicy,
        forwarder: Arc<dyn ForwardingEngine>,
        sweep_interval: Option<Duration>,
    ) -> Self {
        let pipeline = PipelineBuilder::new(policy);

        tracing::info!(
            upstream = %pipeline.policy().target_display(),
            gates = ?pipeline.gates().iter().map(|g| g.name()).collect::<Vec<_>>(),
            "Pipeline assembled"
        );

        let router = pipeline
            .build(forwarder)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        Self {
            router,
            limiter: pipeline.rate_limiter().cloned(),
            sweep_interval,
        }
    }

    /// Run the server until `shutdown` fires, accepting connections on `listener`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = match (self.limiter.clone(), self.sweep_interval) {
            (Some(limiter), Some(interval)) => Some(tokio::spawn(sweep_loop(limiter, interval))),
            _ => None,
        };

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn sweep_loop(limiter: Arc<RateLimiter>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let removed = limiter.sweep_idle();
        let tracked = limiter.tracked_identifiers();
        metrics::record_tracked_identifiers(tracked);
        tracing::debug!(removed, tracked, "Swept idle rate-limit windows");
    }
}
