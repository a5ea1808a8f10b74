//! Forwarding engine: relays an admitted request to the fixed upstream.
//!
//! # Responsibilities
//! - Rewrite scheme/authority (and base path) to the upstream target
//! - Normalize request headers (Host, X-Forwarded-*, User-Agent)
//! - Strip hop-by-hop headers in both directions
//! - Stream the upstream response back untouched otherwise
//!
//! No retries and no locks: a failure is surfaced once as a 502.

use std::error::Error as StdError;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue, Uri, Version},
    response::Response,
};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tracing::debug;
use url::Url;

use super::middleware::peer_addr;
use crate::error::ProxyError;
use crate::policy::AccessPolicy;

pub const USER_AGENT_VALUE: &str = concat!("access-proxy/", env!("CARGO_PKG_VERSION"));

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Serves one request against the upstream.
///
/// The innermost stage of the pipeline. Implementations must not hold
/// pipeline locks while awaiting the upstream.
pub trait ForwardingEngine: Send + Sync + 'static {
    fn forward(&self, request: Request) -> BoxFuture<'static, Result<Response, ProxyError>>;
}

/// Hyper-based forwarder for a single `http://` upstream.
#[derive(Clone)]
pub struct UpstreamForwarder {
    client: Client<HttpConnector, Body>,
    target: Url,
    timeout: Duration,
}

impl UpstreamForwarder {
    pub fn new(target: Url, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            target,
            timeout,
        }
    }

    pub fn from_policy(policy: &AccessPolicy) -> Self {
        Self::new(policy.upstream_target.clone(), policy.upstream_timeout)
    }

    /// Turn an inbound request into the request sent upstream.
    pub fn prepare(&self, request: Request) -> Result<Request, ProxyError> {
        let peer = peer_addr(&request);
        let (mut parts, body) = request.into_parts();

        parts.uri = upstream_uri(&self.target, &parts.uri)?;
        parts.version = Version::HTTP_11;

        let headers = &mut parts.headers;
        let original_host = headers.get(header::HOST).cloned();
        strip_hop_by_hop(headers);
        headers.remove(header::ACCEPT_ENCODING);
        headers.remove(X_FORWARDED_PROTO);
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        if let Some(authority) = parts.uri.authority() {
            let host = HeaderValue::from_str(authority.as_str())
                .map_err(|e| ProxyError::Internal(format!("invalid upstream host: {}", e)))?;
            headers.insert(header::HOST, host);
        }
        if let Some(original_host) = original_host {
            headers.insert(X_FORWARDED_HOST, original_host);
        }
        if let Some(peer) = peer {
            let forwarded_for = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
                Some(prior) => format!("{}, {}", prior, peer.ip()),
                None => peer.ip().to_string(),
            };
            let value = HeaderValue::from_str(&forwarded_for)
                .map_err(|e| ProxyError::Internal(format!("invalid X-Forwarded-For: {}", e)))?;
            headers.insert(X_FORWARDED_FOR, value);
        }

        Ok(Request::from_parts(parts, body))
    }
}

impl ForwardingEngine for UpstreamForwarder {
    fn forward(&self, request: Request) -> BoxFuture<'static, Result<Response, ProxyError>> {
        let prepared = self.prepare(request);
        let client = self.client.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let request = prepared?;
            let method = request.method().clone();
            let uri = request.uri().clone();
            debug!(method = %method, uri = %uri, "Forwarding to upstream");

            let upstream = tokio::time::timeout(timeout, client.request(request)).await;
            let response: hyper::Response<Incoming> = match upstream {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(ProxyError::BadGateway(error_chain(&e))),
                Err(_) => {
                    return Err(ProxyError::BadGateway(format!(
                        "upstream did not respond within {}s",
                        timeout.as_secs()
                    )))
                }
            };

            debug!(method = %method, uri = %uri, status = response.status().as_u16(), "Upstream responded");

            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Ok(Response::from_parts(parts, Body::new(body)))
        })
    }
}

/// Map an inbound URI onto the upstream target.
///
/// Base paths are joined with exactly one slash; query strings are merged.
pub fn upstream_uri(target: &Url, incoming: &Uri) -> Result<Uri, ProxyError> {
    let host = target
        .host_str()
        .ok_or_else(|| ProxyError::Configuration("upstream target has no host".into()))?;
    let authority = match target.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let path = join_paths(target.path(), incoming.path());
    let query = match (target.query().filter(|q| !q.is_empty()), incoming.query()) {
        (Some(base), Some(extra)) => format!("?{}&{}", base, extra),
        (Some(base), None) => format!("?{}", base),
        (None, Some(extra)) => format!("?{}", extra),
        (None, None) => String::new(),
    };

    format!("{}://{}{}{}", target.scheme(), authority, path, query)
        .parse::<Uri>()
        .map_err(|e| ProxyError::Internal(format!("failed to build upstream URI: {}", e)))
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in &listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
