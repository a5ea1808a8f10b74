//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)          command-line flags
//!     → loader.rs (parse)         → flags.rs (clap)
//!            └──── merge: flags win when given ────┘
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated)
//!     → AccessPolicy (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod flags;
pub mod loader;
pub mod schema;
pub mod validation;

pub use flags::Flags;
pub use loader::{read_config, read_config_or_default, ConfigError};
pub use schema::{
    AccessConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, RateLimitConfig,
    UpstreamConfig,
};
