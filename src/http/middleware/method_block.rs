//! Method deny-list gate (405).

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::ProxyError;
use crate::observability::metrics;
use crate::policy::AccessPolicy;
use crate::security::methods;

pub async fn method_block_middleware(
    State(policy): State<Arc<AccessPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_ascii_uppercase();

    if methods::is_blocked(&method, &policy.blocked_methods) {
        warn!(method = %method, path = %request.uri().path(), "Method blocked");
        metrics::record_rejection("method_block");
        return ProxyError::MethodNotAllowed {
            method,
            blocked_methods: policy.blocked_methods.clone(),
        }
        .into_response();
    }

    next.run(request).await
}
