//! Client identity allow-list gate (403).

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::peer_addr;
use crate::error::ProxyError;
use crate::observability::metrics;
use crate::policy::AccessPolicy;
use crate::security::{identity, matcher};

pub async fn client_domain_middleware(
    State(policy): State<Arc<AccessPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = peer_addr(&request);
    let identifier = identity::resolve_identity(request.headers(), peer);
    let client_type = identity::client_type(request.headers(), peer);

    if !matcher::any_match(&identifier, &policy.allowed_identities) {
        warn!(
            client = %identifier,
            client_type = ?client_type,
            allowed = ?policy.allowed_identities,
            "Client not allowed"
        );
        metrics::record_rejection("client_domain");
        return ProxyError::ClientNotAllowed {
            identifier,
            client_type,
            allowed: policy.allowed_identities.clone(),
        }
        .into_response();
    }

    debug!(client = %identifier, client_type = ?client_type, "Client allowed");
    next.run(request).await
}
