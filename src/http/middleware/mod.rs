//! Admission-control gates as axum middleware.
//!
//! Each gate either short-circuits with a [`ProxyError`](crate::error::ProxyError)
//! response or calls the next stage. Composition order is owned by
//! [`PipelineBuilder`](crate::http::pipeline::PipelineBuilder).

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

pub mod client_domain;
pub mod method_block;
pub mod rate_limit;
pub mod request_log;

pub use client_domain::client_domain_middleware;
pub use method_block::method_block_middleware;
pub use rate_limit::rate_limit_middleware;
pub use request_log::request_log_middleware;

/// Transport peer address, when the server was started with connect info.
pub fn peer_addr(request: &Request) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}
