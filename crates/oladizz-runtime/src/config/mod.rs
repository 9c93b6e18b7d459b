//! Configuration for the Oladizz runtime.
//!
//! Layered loading from defaults, TOML/YAML files and the environment, the
//! schema every layer deserializes into, and startup validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    HealthConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, OladizzConfig,
    RuntimeConfig, SpanEventConfig, StoreBackend, StoreConfig, TelegramConfig, ToolsConfig,
};
pub use validation::validate_config;
