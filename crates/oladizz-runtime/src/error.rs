//! Runtime error types.

use thiserror::Error;

use oladizz_core::{ApiError, StoreError};
use oladizz_framework::FrameworkError;

use crate::config::ConfigError;

/// Errors that can occur while starting or running the bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The registry or menu failed startup validation.
    #[error("Invalid handler wiring: {0}")]
    Wiring(#[from] FrameworkError),

    #[error("State store unavailable: {0}")]
    Store(#[from] StoreError),

    /// The update source stopped with an error.
    #[error("Update source '{name}' failed: {source}")]
    Source {
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
