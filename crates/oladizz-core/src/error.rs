//! Unified error types for the Oladizz core.
//!
//! Handler-level errors live in `oladizz-framework`; this module only covers
//! the two collaborators every layer touches: the state store and the
//! outbound messaging API.

use thiserror::Error;

use crate::ids::ChatId;

// =============================================================================
// Store Errors
// =============================================================================

/// Errors raised by a [`StateStore`](crate::store::StateStore).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A partial update targeted a record that does not exist.
    #[error("no state record for chat {0}")]
    NotFound(ChatId),

    /// A field update could not be applied to the stored document.
    #[error("invalid field update at '{path}': {reason}")]
    InvalidUpdate {
        /// Dotted path of the offending field.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// A stored document could not be decoded.
    #[error("corrupt state record for chat {chat}: {reason}")]
    Corrupt {
        /// The chat whose record is unreadable.
        chat: ChatId,
        /// Reason for failure.
        reason: String,
    },

    /// The backend is unreachable or failed to persist.
    #[error("store I/O error: {0}")]
    Io(String),
}

impl StoreError {
    /// Creates an invalid-update error.
    pub fn invalid_update(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUpdate {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the record was missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Error type for outbound platform calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The call timed out.
    #[error("API call timed out")]
    Timeout,
    /// The platform rejected the call.
    #[error("API error ({code}): {message}")]
    Rejected { code: i64, message: String },
    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Network or local I/O failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for outbound calls.
pub type ApiResult<T> = Result<T, ApiError>;
