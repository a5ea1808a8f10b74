//! Command-line flags.
//!
//! Flags override file values only when they are given on the command line.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::schema::ProxyConfig;

pub const DEFAULT_CONFIG_PATH: &str = "access-proxy.toml";

#[derive(Debug, Clone, Parser)]
#[command(name = "access-proxy")]
#[command(about = "HTTP proxy with admission control in front of a single upstream", long_about = None)]
pub struct Flags {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Port to listen on (keeps the configured bind IP)
    #[arg(long)]
    pub port: Option<u16>,

    /// Upstream target URL
    #[arg(long)]
    pub target: Option<String>,

    /// Allowed client domains, comma separated
    #[arg(long, value_delimiter = ',')]
    pub domains: Option<Vec<String>>,

    /// Blocked HTTP methods, comma separated
    #[arg(long, value_delimiter = ',')]
    pub blocks: Option<Vec<String>>,

    /// Requests per window and client (0 disables rate limiting)
    #[arg(long, allow_hyphen_values = true)]
    pub rate: Option<i64>,

    /// Enable or disable request logging
    #[arg(long, action = ArgAction::Set)]
    pub log: Option<bool>,
}

impl Flags {
    pub fn uses_default_config(&self) -> bool {
        self.config.as_os_str() == DEFAULT_CONFIG_PATH
    }

    /// Apply every flag that was given on top of `config`.
    pub fn apply(&self, mut config: ProxyConfig) -> ProxyConfig {
        if let Some(port) = self.port {
            let host = config
                .listener
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            config.listener.bind_address = format!("{}:{}", host, port);
        }
        if let Some(target) = &self.target {
            config.upstream.target = target.clone();
        }
        if let Some(domains) = &self.domains {
            config.access.allowed_domains = domains.clone();
        }
        if let Some(blocks) = &self.blocks {
            config.access.blocked_methods = blocks.clone();
        }
        if let Some(rate) = self.rate {
            config.rate_limit.requests_per_window = rate;
        }
        if let Some(log) = self.log {
            config.observability.log_requests = log;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_flags_keep_file_values() {
        let flags = Flags::parse_from(["access-proxy"]);
        let mut file = ProxyConfig::default();
        file.upstream.target = "http://10.0.0.2:9000".into();
        file.rate_limit.requests_per_window = 7;

        let merged = flags.apply(file);
        assert_eq!(merged.upstream.target, "http://10.0.0.2:9000");
        assert_eq!(merged.rate_limit.requests_per_window, 7);
        assert!(flags.uses_default_config());
    }

    #[test]
    fn test_flags_override() {
        let flags = Flags::parse_from([
            "access-proxy",
            "--config",
            "/etc/proxy.toml",
            "--port",
            "9100",
            "--domains",
            "example.com,*.api.io",
            "--blocks",
            "DELETE,PATCH",
            "--rate",
            "0",
            "--log",
            "false",
        ]);
        let merged = flags.apply(ProxyConfig::default());
        assert_eq!(merged.listener.bind_address, "0.0.0.0:9100");
        assert_eq!(merged.access.allowed_domains, vec!["example.com", "*.api.io"]);
        assert_eq!(merged.access.blocked_methods, vec!["DELETE", "PATCH"]);
        assert_eq!(merged.rate_limit.requests_per_window, 0);
        assert!(!merged.observability.log_requests);
        assert!(!flags.uses_default_config());
    }
}
