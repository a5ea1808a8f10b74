//! Allow-list matching of client identifiers.
//!
//! # Rules
//! Evaluated in order per pattern, first success wins:
//! 1. Exact, case-sensitive equality
//! 2. Dotted prefix (`"192.168."`) against identifiers that parse as IPs
//! 3. Wildcard subdomain (`"*.example.com"` matches `"api.example.com"`)
//! 4. Loopback aliases: `localhost`, `127.0.0.1` and `::1` are interchangeable
//! 5. CIDR membership (`"10.0.0.0/8"`)
//!
//! An identifier that is empty after trimming never matches.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

const LOOPBACK_ALIASES: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// True if `identifier` is allowed by `pattern`.
pub fn matches(identifier: &str, pattern: &str) -> bool {
    let identifier = identifier.trim();
    let pattern = pattern.trim();
    if identifier.is_empty() || pattern.is_empty() {
        return false;
    }

    if identifier == pattern {
        return true;
    }

    let identifier_ip = identifier.parse::<IpAddr>().ok();

    if pattern.ends_with('.') && identifier_ip.is_some() && identifier.starts_with(pattern) {
        return true;
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        if suffix.starts_with('.') && identifier.ends_with(suffix) {
            return true;
        }
    }

    if LOOPBACK_ALIASES.contains(&identifier) && LOOPBACK_ALIASES.contains(&pattern) {
        return true;
    }

    match (identifier_ip, pattern.parse::<Cidr>()) {
        (Some(ip), Ok(block)) => block.contains(ip),
        _ => false,
    }
}

/// Disjunction of [`matches`] over `patterns`.
///
/// An empty pattern list means "no restriction" and always allows.
pub fn any_match<S: AsRef<str>>(identifier: &str, patterns: &[S]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    patterns
        .iter()
        .any(|pattern| matches(identifier, pattern.as_ref()))
}

/// An IPv4 or IPv6 network block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    network: IpAddr,
    prefix: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrParseError(String);

impl fmt::Display for CidrParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid CIDR block: {}", self.0)
    }
}

impl std::error::Error for CidrParseError {}

impl FromStr for Cidr {
    type Err = CidrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CidrParseError(s.to_string());
        let (addr, prefix) = s.split_once('/').ok_or_else(invalid)?;
        let network: IpAddr = addr.parse().map_err(|_| invalid())?;
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        let max = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix > max {
            return Err(invalid());
        }
        Ok(Self { network, prefix })
    }
}

impl Cidr {
    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = match ip {
            IpAddr::V6(v6) => v6
                .to_ipv4_mapped()
                .map(IpAddr::V4)
                .unwrap_or(IpAddr::V6(v6)),
            v4 => v4,
        };

        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = u32::MAX.checked_shl(32 - self.prefix as u32).unwrap_or(0);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = u128::MAX.checked_shl(128 - self.prefix as u32).unwrap_or(0);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}
