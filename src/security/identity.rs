//! Client identity resolution.
//!
//! # Precedence
//! ```text
//! Origin  → host of the URL
//! Referer → host of the URL
//! Host    → header value without port
//! else    → remote IP (X-Real-IP, X-Forwarded-For[0], peer address)
//!           → "localhost" when loopback/private/link-local/unspecified
//! ```
//!
//! Pure string parsing. A header that yields an empty host falls through to
//! the next rule.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use axum::http::HeaderMap;
use serde::Serialize;

pub const LOCALHOST: &str = "localhost";
pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Coarse classification of the caller, reported in denial bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Browser,
    Local,
    External,
}

/// Resolve the identifier used for allow-list matching.
pub fn resolve_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    for name in ["origin", "referer"] {
        if let Some(value) = header_str(headers, name) {
            let host = host_from_url(value);
            if !host.is_empty() {
                return host;
            }
        }
    }

    if let Some(value) = header_str(headers, "host") {
        let host = strip_port(value.trim());
        if !host.is_empty() {
            return host.to_string();
        }
    }

    let ip = client_ip(headers, peer);
    if is_local_address(&ip) {
        LOCALHOST.to_string()
    } else {
        ip
    }
}

/// Remote IP of the caller as reported by proxy headers or the transport.
///
/// Returns an empty string when nothing is available.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(real_ip) = header_str(headers, X_REAL_IP) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    if let Some(forwarded) = header_str(headers, X_FORWARDED_FOR) {
        let first = forwarded.split(',').next().unwrap_or_default().trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

pub fn client_type(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientType {
    if header_str(headers, "origin").is_some() {
        return ClientType::Browser;
    }
    if is_local_address(&client_ip(headers, peer)) {
        ClientType::Local
    } else {
        ClientType::External
    }
}

/// Extract the host component from a URL-like string.
///
/// Missing schemes are tolerated (`example.com/path` → `example.com`).
pub fn host_from_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let rest = match raw.split_once("://") {
        Some((_, rest)) => rest,
        None => raw,
    };
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let authority = match authority.rsplit_once('@') {
        Some((_, host)) => host,
        None => authority,
    };

    strip_port(authority).to_string()
}

/// Strip a trailing `:port`, unwrapping bracketed IPv6 literals.
fn strip_port(authority: &str) -> &str {
    if let Some(rest) = authority.strip_prefix('[') {
        return rest.split(']').next().unwrap_or_default();
    }
    // A bare IPv6 literal has more than one colon and no port.
    if authority.matches(':').count() > 1 {
        return authority;
    }
    authority.split(':').next().unwrap_or_default()
}

/// True for `localhost` and for loopback, private, link-local or unspecified IPs.
pub fn is_local_address(candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return false;
    }
    if candidate == LOCALHOST {
        return true;
    }
    match candidate.parse::<IpAddr>() {
        Ok(ip) => is_local_ip(ip),
        Err(_) => false,
    }
}

pub fn is_local_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_local_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_local_v4(v4),
            None => is_local_v6(v6),
        },
    }
}

fn is_local_v4(ip: Ipv4Addr) -> bool {
    let link_local_multicast = ip.octets()[..3] == [224, 0, 0];
    ip.is_loopback()
        || ip.is_private()
        || ip.is_unspecified()
        || ip.is_link_local()
        || link_local_multicast
}

fn is_local_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let unique_local = first & 0xfe00 == 0xfc00;
    let link_local_unicast = first & 0xffc0 == 0xfe80;
    let link_local_multicast = first & 0xff0f == 0xff02;
    ip.is_loopback() || ip.is_unspecified() || unique_local || link_local_unicast || link_local_multicast
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_origin_wins() {
        let h = headers(&[
            ("origin", "https://app.example.com:8443"),
            ("referer", "https://other.example.com/page"),
            ("host", "proxy.local:8000"),
        ]);
        assert_eq!(resolve_identity(&h, None), "app.example.com");
    }

    #[test]
    fn test_referer_then_host() {
        let h = headers(&[("referer", "http://docs.example.com/a/b?c=d"), ("host", "proxy:8000")]);
        assert_eq!(resolve_identity(&h, None), "docs.example.com");

        let h = headers(&[("host", "proxy.internal:8000")]);
        assert_eq!(resolve_identity(&h, None), "proxy.internal");
    }

    #[test]
    fn test_malformed_origin_falls_through() {
        let h = headers(&[("origin", "http:///nohost"), ("host", "fallback.example")]);
        assert_eq!(resolve_identity(&h, None), "fallback.example");
    }

    #[test]
    fn test_remote_ip_fallback() {
        let peer: SocketAddr = "203.0.113.7:51234".parse().unwrap();
        assert_eq!(resolve_identity(&HeaderMap::new(), Some(peer)), "203.0.113.7");

        let local: SocketAddr = "192.168.1.20:40000".parse().unwrap();
        assert_eq!(resolve_identity(&HeaderMap::new(), Some(local)), "localhost");
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer: SocketAddr = "10.0.0.1:1234".parse().unwrap();
        let h = headers(&[("x-real-ip", "198.51.100.1"), ("x-forwarded-for", "198.51.100.2")]);
        assert_eq!(client_ip(&h, Some(peer)), "198.51.100.1");

        let h = headers(&[("x-forwarded-for", " 198.51.100.2 , 10.0.0.5")]);
        assert_eq!(client_ip(&h, Some(peer)), "198.51.100.2");

        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "10.0.0.1");
        assert_eq!(client_ip(&HeaderMap::new(), None), "");
    }

    #[test]
    fn test_host_extraction() {
        assert_eq!(host_from_url("example.com/path"), "example.com");
        assert_eq!(host_from_url("https://user:pw@example.com:9000/x"), "example.com");
        assert_eq!(host_from_url("http://[::1]:8080/"), "::1");
        assert_eq!(host_from_url("   "), "");
        assert_eq!(host_from_url("null"), "null");
    }

    #[test]
    fn test_local_addresses() {
        for ip in ["127.0.0.1", "::1", "10.1.2.3", "172.16.0.1", "192.168.0.1", "169.254.1.1", "0.0.0.0", "fe80::1", "fd00::1", "::ffff:127.0.0.1", "localhost"] {
            assert!(is_local_address(ip), "{ip} should be local");
        }
        for ip in ["8.8.8.8", "2001:4860:4860::8888", "not-an-ip", ""] {
            assert!(!is_local_address(ip), "{ip} should not be local");
        }
    }

    #[test]
    fn test_client_type() {
        let peer: SocketAddr = "8.8.8.8:1".parse().unwrap();
        let h = headers(&[("origin", "https://a.example")]);
        assert_eq!(client_type(&h, Some(peer)), ClientType::Browser);
        assert_eq!(client_type(&HeaderMap::new(), Some(peer)), ClientType::External);
        let local: SocketAddr = "127.0.0.1:1".parse().unwrap();
        assert_eq!(client_type(&HeaderMap::new(), Some(local)), ClientType::Local);
    }
}
