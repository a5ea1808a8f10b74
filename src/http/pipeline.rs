//! Pipeline assembly.
//!
//! # Ordering
//! ```text
//! outermost (evaluated first)
//!     → method block      (405)
//!     → client domain     (403)
//!     → request log       (observes only what passed the two above)
//!     → rate limit        (429)
//!     → info routes / forwarding engine
//! innermost
//! ```
//!
//! Each gate is installed only when the policy enables it. The enabled
//! list is computed by [`PipelineBuilder::gates`] and applied in reverse,
//! because the last `Router::layer` call wraps everything before it.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    Router,
};
use tracing::error;

use super::forward::ForwardingEngine;
use super::info;
use super::middleware::{
    client_domain_middleware, method_block_middleware, rate_limit_middleware,
    request_log_middleware,
};
use super::server::AppState;
use crate::observability::metrics;
use crate::policy::AccessPolicy;
use crate::security::RateLimiter;

/// A single admission-control stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    MethodBlock,
    ClientDomain,
    RequestLog,
    RateLimit,
}

impl Gate {
    pub fn name(&self) -> &'static str {
        match self {
            Gate::MethodBlock => "method_block",
            Gate::ClientDomain => "client_domain",
            Gate::RequestLog => "request_log",
            Gate::RateLimit => "rate_limit",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Composes the enabled gates around a forwarding engine.
pub struct PipelineBuilder {
    policy: Arc<AccessPolicy>,
    limiter: Option<Arc<RateLimiter>>,
}

impl PipelineBuilder {
    pub fn new(policy: AccessPolicy) -> Self {
        let limiter = policy
            .rate_limit
            .map(|rate| Arc::new(RateLimiter::new(rate)));
        Self {
            policy: Arc::new(policy),
            limiter,
        }
    }

    pub fn policy(&self) -> &Arc<AccessPolicy> {
        &self.policy
    }

    /// `None` when rate limiting is disabled.
    pub fn rate_limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.limiter.as_ref()
    }

    /// Enabled gates, outermost first.
    pub fn gates(&self) -> Vec<Gate> {
        let mut gates = Vec::with_capacity(4);
        if !self.policy.blocked_methods.is_empty() {
            gates.push(Gate::MethodBlock);
        }
        if !self.policy.allowed_identities.is_empty() {
            gates.push(Gate::ClientDomain);
        }
        if self.policy.logging_enabled {
            gates.push(Gate::RequestLog);
        }
        if self.limiter.is_some() {
            gates.push(Gate::RateLimit);
        }
        gates
    }

    pub fn build(&self, forwarder: Arc<dyn ForwardingEngine>) -> Router {
        let state = AppState {
            policy: self.policy.clone(),
            limiter: self.limiter.clone(),
            forwarder,
        };

        let mut router: Router = info::routes()
            .fallback(forward_handler)
            .with_state(state);

        for gate in self.gates().into_iter().rev() {
            router = match gate {
                Gate::MethodBlock => router.layer(from_fn_with_state(
                    self.policy.clone(),
                    method_block_middleware,
                )),
                Gate::ClientDomain => router.layer(from_fn_with_state(
                    self.policy.clone(),
                    client_domain_middleware,
                )),
                Gate::RequestLog => router.layer(from_fn(request_log_middleware)),
                Gate::RateLimit => match &self.limiter {
                    Some(limiter) => {
                        router.layer(from_fn_with_state(limiter.clone(), rate_limit_middleware))
                    }
                    None => router,
                },
            };
        }

        router
    }
}

/// Innermost stage: hand the admitted request to the forwarding engine.
async fn forward_handler(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match state.forwarder.forward(request).await {
        Ok(response) => response,
        Err(err) => {
            error!(method = %method, path = %path, error = %err, "Forwarding failed");
            metrics::record_upstream_error();
            err.into_response()
        }
    }
}
