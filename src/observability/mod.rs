//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gates and forwarding produce:
//!     → logging.rs (subscriber setup for tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Code logs through the `tracing` facade only; the subscriber is chosen
//!   at startup
//! - Request ID (`x-request-id`) flows through the request logging gate

pub mod logging;
pub mod metrics;
