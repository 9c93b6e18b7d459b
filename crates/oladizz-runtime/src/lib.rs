//! # Oladizz Runtime
//!
//! Everything around the conversation engine that a deployed bot needs:
//!
//! - Layered configuration ([`ConfigLoader`], [`OladizzConfig`])
//! - Logging setup ([`LoggingBuilder`])
//! - The process lifecycle ([`OladizzRuntime`]): event loop, concurrency
//!   limit, health endpoint and graceful shutdown

pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, OladizzConfig, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use health::HealthServer;
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{OladizzRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;

/// Commonly used logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
