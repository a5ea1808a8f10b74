//! HTTP method deny-list.

/// Methods reported by `/methods` when nothing is blocked.
pub const STANDARD_METHODS: [&str; 9] = [
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE",
];

/// Case-insensitive membership test against the deny-list.
pub fn is_blocked<S: AsRef<str>>(method: &str, blocked_methods: &[S]) -> bool {
    blocked_methods
        .iter()
        .any(|blocked| blocked.as_ref().trim().eq_ignore_ascii_case(method.trim()))
}

/// Standard methods that survive the deny-list, in canonical order.
pub fn allowed_methods<S: AsRef<str>>(blocked_methods: &[S]) -> Vec<&'static str> {
    STANDARD_METHODS
        .iter()
        .copied()
        .filter(|method| !is_blocked(method, blocked_methods))
        .collect()
}

/// Upper-case and de-duplicate a configured deny-list, preserving order.
pub fn normalize<S: AsRef<str>>(methods: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(methods.len());
    for method in methods {
        let method = method.as_ref().trim().to_ascii_uppercase();
        if !method.is_empty() && !normalized.contains(&method) {
            normalized.push(method);
        }
    }
    normalized
}
