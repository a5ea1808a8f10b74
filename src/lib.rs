//! Access-control HTTP proxy library.
//!
//! Admission gates (method deny-list, client allow-list, request logging,
//! sliding-window rate limiting) in front of a single upstream target.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod policy;
pub mod security;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use policy::AccessPolicy;
