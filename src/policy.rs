//! Immutable admission policy.
//!
//! Built once from a validated [`ProxyConfig`] and shared read-only via `Arc`
//! by every gate for the lifetime of the process.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;

use url::{Host, Url};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::security::methods;

/// Rate limit settings. Only exists when the configured limit is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit_per_window: NonZeroU32,
    pub window: Duration,
}

impl RateLimitPolicy {
    /// `None` when `limit <= 0`, which disables rate limiting entirely.
    pub fn new(limit: i64, window: Duration) -> Option<Self> {
        let limit = u32::try_from(limit.max(0)).unwrap_or(u32::MAX);
        NonZeroU32::new(limit).map(|limit_per_window| Self {
            limit_per_window,
            window,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    /// Allow-list patterns, trimmed and de-duplicated in configured order.
    pub allowed_identities: Vec<String>,
    /// Upper-cased deny-list.
    pub blocked_methods: Vec<String>,
    pub rate_limit: Option<RateLimitPolicy>,
    pub logging_enabled: bool,
    pub upstream_target: Url,
    pub upstream_timeout: Duration,
    /// Listening port, reported by the informational endpoints.
    pub listen_port: u16,
}

impl AccessPolicy {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let upstream_target = parse_target(&config.upstream.target)?;

        let listen_port = config
            .listener
            .bind_address
            .parse::<SocketAddr>()
            .map(|addr| addr.port())
            .map_err(|e| {
                ProxyError::Configuration(format!(
                    "invalid bind address {:?}: {}",
                    config.listener.bind_address, e
                ))
            })?;

        let mut allowed_identities: Vec<String> = Vec::new();
        for pattern in &config.access.allowed_domains {
            let pattern = pattern.trim().to_string();
            if !pattern.is_empty() && !allowed_identities.contains(&pattern) {
                allowed_identities.push(pattern);
            }
        }

        Ok(Self {
            allowed_identities,
            blocked_methods: methods::normalize(&config.access.blocked_methods),
            rate_limit: RateLimitPolicy::new(
                config.rate_limit.requests_per_window,
                Duration::from_secs(config.rate_limit.window_secs),
            ),
            logging_enabled: config.observability.log_requests,
            upstream_target,
            upstream_timeout: Duration::from_secs(config.upstream.timeout_secs),
            listen_port,
        })
    }

    /// Upstream host as the matcher sees it: IPv6 literals without brackets.
    pub fn target_host(&self) -> String {
        match self.upstream_target.host() {
            Some(Host::Ipv6(ip)) => ip.to_string(),
            Some(host) => host.to_string(),
            None => String::new(),
        }
    }

    /// Upstream target as configured, without the trailing slash `Url` adds.
    pub fn target_display(&self) -> String {
        self.upstream_target
            .as_str()
            .trim_end_matches('/')
            .to_string()
    }
}

pub(crate) fn parse_target(raw: &str) -> Result<Url, ProxyError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ProxyError::Configuration(
            "upstream target is required".into(),
        ));
    }
    let url = Url::parse(raw).map_err(|e| {
        ProxyError::Configuration(format!("failed to parse upstream target {:?}: {}", raw, e))
    })?;
    if url.scheme() != "http" {
        return Err(ProxyError::Configuration(format!(
            "unsupported upstream scheme {:?}, expected http",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ProxyError::Configuration(format!(
            "upstream target {:?} has no host",
            raw
        )));
    }
    Ok(url)
}
