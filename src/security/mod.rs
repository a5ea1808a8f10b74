//! Security subsystem: the pure decision logic behind each gate.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → methods.rs   (method deny-list)
//!     → identity.rs  (resolve client identifier / client IP)
//!     → matcher.rs   (identifier vs allow-list)
//!     → rate_limit.rs (sliding window per client IP)
//!     → Pass to forwarding
//! ```
//!
//! # Design Decisions
//! - No I/O here; the axum middleware in `http::middleware` wraps these
//! - Fail closed: an empty identifier never matches an allow-list entry
//! - Empty lists mean "no restriction" on that axis

pub mod identity;
pub mod matcher;
pub mod methods;
pub mod rate_limit;

pub use identity::ClientType;
pub use rate_limit::{RateDecision, RateLimiter};
