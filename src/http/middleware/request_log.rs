//! Request/response observation with timing.
//!
//! Sits inside the method and domain gates, so only traffic that reaches
//! rate limiting and forwarding is logged.

use std::time::Instant;

use axum::{extract::Request, http::header, middleware::Next, response::Response};
use tracing::info;

use super::peer_addr;
use crate::observability::metrics;

pub async fn request_log_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = header_or_dash(&request, "x-request-id");
    let user_agent = header_or_dash(&request, header::USER_AGENT.as_str());
    let remote = peer_addr(&request)
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        version = ?request.version(),
        remote = %remote,
        user_agent = %user_agent,
        "Request started"
    );

    let response = next.run(request).await;

    let status = response.status();
    info!(
        request_id = %request_id,
        method = %method,
        path = %uri.path(),
        status = status.as_u16(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Request completed"
    );
    metrics::record_request(method.as_str(), status.as_u16(), start);

    response
}

fn header_or_dash(request: &Request, name: &str) -> String {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}
