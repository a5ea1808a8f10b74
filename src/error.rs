//! Error taxonomy for the proxy.
//!
//! Every gate decision and forwarding failure ends up as a [`ProxyError`],
//! which renders itself as a JSON body of the shape
//! `{"error": <kind>, "message": <text>, ...context}`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::security::identity::ClientType;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Request method is on the configured deny-list.
    #[error("HTTP method {method} is not allowed")]
    MethodNotAllowed {
        method: String,
        blocked_methods: Vec<String>,
    },

    /// Non-GET request to one of the informational endpoints.
    #[error("Method {method} not allowed on {path}")]
    EndpointMethodNotAllowed { method: String, path: String },

    /// Resolved client identity did not match the allow-list.
    #[error("Client {identifier} is not in allowed list")]
    ClientNotAllowed {
        identifier: String,
        client_type: ClientType,
        allowed: Vec<String>,
    },

    #[error("Too many requests from {identifier}")]
    RateLimitExceeded {
        identifier: String,
        limit: u32,
        window: Duration,
        retry_after: Duration,
    },

    /// Forwarding engine failure, message surfaced verbatim.
    #[error("{0}")]
    BadGateway(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Machine-readable error kind used in the `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MethodNotAllowed { .. } | ProxyError::EndpointMethodNotAllowed { .. } => {
                "method_not_allowed"
            }
            ProxyError::ClientNotAllowed { .. } => "client_not_allowed",
            ProxyError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            ProxyError::BadGateway(_) => "bad_gateway",
            ProxyError::Configuration(_) => "configuration_error",
            ProxyError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed { .. } | ProxyError::EndpointMethodNotAllowed { .. } => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            ProxyError::ClientNotAllowed { .. } => StatusCode::FORBIDDEN,
            ProxyError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Configuration(_) | ProxyError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Full JSON body including diagnostic context.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("error".into(), json!(self.kind()));
        body.insert("message".into(), json!(self.to_string()));

        match self {
            ProxyError::MethodNotAllowed {
                method,
                blocked_methods,
            } => {
                body.insert("method".into(), json!(method));
                body.insert("blocked_methods".into(), json!(blocked_methods));
            }
            ProxyError::EndpointMethodNotAllowed { method, path } => {
                body.insert("method".into(), json!(method));
                body.insert("path".into(), json!(path));
                body.insert("allowed".into(), json!(["GET"]));
            }
            ProxyError::ClientNotAllowed {
                identifier,
                client_type,
                allowed,
            } => {
                body.insert("client_identifier".into(), json!(identifier));
                body.insert("client_type".into(), to_value(client_type));
                body.insert("allowed_clients".into(), json!(allowed));
            }
            ProxyError::RateLimitExceeded {
                identifier,
                limit,
                window,
                retry_after,
            } => {
                body.insert("identifier".into(), json!(identifier));
                body.insert("limit".into(), json!(limit));
                body.insert("window_secs".into(), json!(window.as_secs()));
                body.insert("retry_after_secs".into(), json!(ceil_secs(*retry_after)));
            }
            ProxyError::BadGateway(_) | ProxyError::Configuration(_) | ProxyError::Internal(_) => {}
        }

        Value::Object(body)
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        if let ProxyError::RateLimitExceeded {
            limit, retry_after, ..
        } = &self
        {
            let retry_secs = ceil_secs(*retry_after);
            let reset = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
                .saturating_add(retry_secs);
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(*limit));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(0u32));
            headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset));
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_secs));
        }

        (self.status(), headers, Json(self.body())).into_response()
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
