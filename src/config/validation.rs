//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. All problems are
//! collected rather than stopping at the first one.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;
use crate::policy::parse_target;

/// Longest accepted rate-limit window: one day.
pub const MAX_WINDOW_SECS: u64 = 86_400;

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration. Pure function of its input.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }

    if let Err(e) = parse_target(&config.upstream.target) {
        errors.push(ValidationError::new("upstream.target", e.to_string()));
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "upstream.timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.rate_limit.requests_per_window > 0 {
        let window = config.rate_limit.window_secs;
        if window == 0 {
            errors.push(ValidationError::new(
                "rate_limit.window_secs",
                "must be greater than zero when rate limiting is enabled",
            ));
        } else if window > MAX_WINDOW_SECS {
            errors.push(ValidationError::new(
                "rate_limit.window_secs",
                format!("{} exceeds the maximum of {} seconds", window, MAX_WINDOW_SECS),
            ));
        }
    }

    if config
        .access
        .allowed_domains
        .iter()
        .any(|pattern| pattern.trim().is_empty())
    {
        errors.push(ValidationError::new(
            "access.allowed_domains",
            "entries must not be empty",
        ));
    }

    for method in &config.access.blocked_methods {
        if !is_method_token(method.trim()) {
            errors.push(ValidationError::new(
                "access.blocked_methods",
                format!("{:?} is not a valid HTTP method", method),
            ));
        }
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!(
                "unknown format {:?}, expected \"pretty\" or \"json\"",
                config.observability.log_format
            ),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "{:?} is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_method_token(method: &str) -> bool {
    !method.is_empty() && axum::http::Method::from_bytes(method.as_bytes()).is_ok()
}
