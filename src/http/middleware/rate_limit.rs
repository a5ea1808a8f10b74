//! Sliding-window rate limit gate (429).

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::peer_addr;
use crate::error::{ProxyError, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING};
use crate::observability::metrics;
use crate::security::{identity, RateLimiter};

/// Key used when neither proxy headers nor a peer address identify the caller.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Rate limiting keys on the client IP, never on Origin/Host.
pub fn rate_limit_key(request: &Request) -> String {
    let ip = identity::client_ip(request.headers(), peer_addr(request));
    if ip.is_empty() {
        UNKNOWN_CLIENT.to_string()
    } else {
        ip
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = rate_limit_key(&request);
    let decision = limiter.check(&key);

    if !decision.allowed {
        warn!(
            client = %key,
            method = %request.method(),
            path = %request.uri().path(),
            limit = decision.limit,
            "Rate limit exceeded"
        );
        metrics::record_rejection("rate_limit");
        return ProxyError::RateLimitExceeded {
            identifier: key,
            limit: decision.limit,
            window: limiter.window(),
            retry_after: decision.retry_after,
        }
        .into_response();
    }

    debug!(
        client = %key,
        remaining = decision.remaining,
        limit = decision.limit,
        "Rate limit check passed"
    );

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    response
}
