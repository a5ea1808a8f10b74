//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown_signal() resolves
//!
//! Shutdown (shutdown.rs):
//!     listen_for_signals → Shutdown::trigger → subscribers stop accepting → drain
//! ```
//!
//! # Design Decisions
//! - Ordered startup lives in `main`: config, logging, metrics, then listener
//! - One broadcast channel fans the shutdown out to every long-running task

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
