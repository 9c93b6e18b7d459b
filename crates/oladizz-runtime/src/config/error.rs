//! Errors raised while loading or checking the bot configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// A layer could not be parsed or did not fit the schema.
    #[error("Failed to load configuration: {0}")]
    Unreadable(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    /// A value the bot cannot start without, e.g. `telegram.token`.
    #[error("Missing required configuration value: {field}")]
    MissingField { field: String },

    #[error("Invalid URL `{url}`: {reason}")]
    BadUrl { url: String, reason: String },
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Unreadable(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
