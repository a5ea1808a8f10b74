//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the access proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream every admitted request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Client allow-list and method deny-list.
    pub access: AccessConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream base URL (e.g., "http://127.0.0.1:3000/api").
    pub target: String,

    /// Upper bound on a single forwarded exchange, in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AccessConfig {
    /// Allowed client identities: exact names, `*.suffix`, dotted IP
    /// prefixes, CIDR blocks. Empty means no restriction.
    pub allowed_domains: Vec<String>,

    /// HTTP methods rejected with 405. Empty means nothing is blocked.
    pub blocked_methods: Vec<String>,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per window and client. Zero or negative disables
    /// rate limiting.
    pub requests_per_window: i64,

    /// Sliding window length in seconds.
    pub window_secs: u64,

    /// How often idle identifiers are evicted, in seconds (0 = never).
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_secs: 60,
            sweep_interval_secs: 300,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Log every request that reaches rate limiting / forwarding.
    pub log_requests: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            log_requests: true,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream]
            target = "http://127.0.0.1:3000"

            [access]
            blocked_methods = ["DELETE"]
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.target, "http://127.0.0.1:3000");
        assert_eq!(config.upstream.timeout_secs, 30);
        assert_eq!(config.access.blocked_methods, vec!["DELETE"]);
        assert!(config.access.allowed_domains.is_empty());
        assert_eq!(config.rate_limit.requests_per_window, 100);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8000");
        assert!(config.observability.log_requests);
    }
}
