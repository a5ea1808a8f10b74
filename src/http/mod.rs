//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request id, tracing)
//!     → pipeline.rs (ordered admission gates, see middleware/)
//!     → info.rs (reserved informational paths)
//!       or forward.rs (everything else, relayed to the upstream)
//!     → Send to client
//! ```

pub mod forward;
pub mod info;
pub mod middleware;
pub mod pipeline;
pub mod server;

pub use forward::{ForwardingEngine, UpstreamForwarder};
pub use pipeline::{Gate, PipelineBuilder};
pub use server::{AppState, HttpServer};
