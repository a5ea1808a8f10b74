//! Reserved informational endpoints.
//!
//! Every path here answers GET only; any other method gets a JSON 405.
//! The endpoints sit behind the same gate chain as forwarded traffic.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{Method, Uri},
    routing::{get, MethodRouter},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::middleware::peer_addr;
use super::middleware::rate_limit::rate_limit_key;
use crate::error::ProxyError;
use crate::http::server::AppState;
use crate::policy::AccessPolicy;
use crate::security::{identity, matcher, methods};

pub const SERVICE_NAME: &str = "access-proxy";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get_only(get(health)))
        .route("/config", get_only(get(config)))
        .route("/ratelimit-info", get_only(get(rate_limit_info)))
        .route("/client-info", get_only(get(client_info)))
        .route("/domains", get_only(get(domains)))
        .route("/methods", get_only(get(methods_info)))
}

fn get_only(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(endpoint_method_not_allowed)
}

async fn endpoint_method_not_allowed(method: Method, uri: Uri) -> ProxyError {
    ProxyError::EndpointMethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct Features {
    pub rate_limiting: bool,
    pub request_logging: bool,
    pub client_domain_check: bool,
    pub method_restrictions: bool,
}

impl Features {
    fn of(policy: &AccessPolicy) -> Self {
        Self {
            rate_limiting: policy.rate_limit.is_some(),
            request_logging: policy.logging_enabled,
            client_domain_check: !policy.allowed_identities.is_empty(),
            method_restrictions: !policy.blocked_methods.is_empty(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub port: u16,
    pub target: String,
    pub features: Features,
    pub client_allowed: bool,
}

fn is_client_allowed(policy: &AccessPolicy, request: &Request) -> bool {
    let identifier = identity::resolve_identity(request.headers(), peer_addr(request));
    matcher::any_match(&identifier, &policy.allowed_identities)
}

async fn health(State(state): State<AppState>, request: Request) -> Json<HealthStatus> {
    let policy = &state.policy;
    Json(HealthStatus {
        status: "healthy",
        service: SERVICE_NAME,
        port: policy.listen_port,
        target: policy.target_display(),
        features: Features::of(policy),
        client_allowed: is_client_allowed(policy, &request),
    })
}

async fn config(State(state): State<AppState>) -> Json<Value> {
    let policy = &state.policy;
    let (limit, window_secs) = match policy.rate_limit {
        Some(rate) => (rate.limit_per_window.get(), rate.window.as_secs()),
        None => (0, 0),
    };
    Json(json!({
        "config": {
            "port": policy.listen_port,
            "target": policy.target_display(),
            "rate_limit_per_window": limit,
            "rate_limit_window_secs": window_secs,
            "log_requests": policy.logging_enabled,
            "allowed_domains": policy.allowed_identities,
            "blocked_methods": policy.blocked_methods,
        }
    }))
}

async fn rate_limit_info(State(state): State<AppState>, request: Request) -> Json<Value> {
    let Some(limiter) = &state.limiter else {
        return Json(json!({
            "rate_limiting": false,
            "message": "Rate limiting is disabled",
        }));
    };

    let key = rate_limit_key(&request);
    Json(json!({
        "rate_limiting": true,
        "limit": limiter.limit(),
        "remaining": limiter.remaining_quota(&key),
        "window": describe_window(limiter.window()),
        "window_secs": limiter.window().as_secs(),
        "your_ip": key,
    }))
}

async fn client_info(State(state): State<AppState>, request: Request) -> Json<Value> {
    let policy = &state.policy;
    let peer = peer_addr(&request);
    Json(json!({
        "client_info": {
            "ip": identity::client_ip(request.headers(), peer),
            "domain": identity::resolve_identity(request.headers(), peer),
        },
        "domain_restrictions": {
            "enabled": !policy.allowed_identities.is_empty(),
            "allowed_domains": policy.allowed_identities,
            "client_allowed": is_client_allowed(policy, &request),
        }
    }))
}

async fn domains(State(state): State<AppState>) -> Json<Value> {
    let policy = &state.policy;
    let target_host = policy.target_host();
    Json(json!({
        "domain_restrictions": !policy.allowed_identities.is_empty(),
        "allowed_domains": policy.allowed_identities,
        "current_target": policy.target_display(),
        "target_allowed": matcher::any_match(&target_host, &policy.allowed_identities),
    }))
}

async fn methods_info(State(state): State<AppState>) -> Json<Value> {
    let policy = &state.policy;
    Json(json!({
        "method_restrictions": {
            "enabled": !policy.blocked_methods.is_empty(),
            "blocked_methods": policy.blocked_methods,
            "allowed_methods": methods::allowed_methods(&policy.blocked_methods),
        }
    }))
}

/// Human-readable window length, e.g. "1 minute" or "90 seconds".
pub fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    match secs {
        60 => "1 minute".to_string(),
        1 => "1 second".to_string(),
        s if s > 0 && s % 3600 == 0 => {
            let hours = s / 3600;
            if hours == 1 {
                "1 hour".to_string()
            } else {
                format!("{} hours", hours)
            }
        }
        s if s > 0 && s % 60 == 0 => format!("{} minutes", s / 60),
        s => format!("{} seconds", s),
    }
}
