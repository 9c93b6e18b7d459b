//! Error types for feature tools and remote clients.

use oladizz_framework::{FailureCategory, HandlerError};
use thiserror::Error;

/// Errors raised by media tools and remote clients.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A remote service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never got an answer.
    #[error("request failed: {0}")]
    Request(String),

    /// An external program exited unsuccessfully.
    #[error("{program} exited with {code:?}: {stderr}")]
    Process {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input or output could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl ToolError {
    pub fn decode(detail: impl std::fmt::Display) -> Self {
        Self::Decode(detail.to_string())
    }

    /// HTTP status of a remote failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Failure category by HTTP status.
    pub fn category(&self) -> FailureCategory {
        match self.status() {
            Some(404) => FailureCategory::NotFound,
            Some(401 | 403) => FailureCategory::AuthFailed,
            Some(422) => FailureCategory::AlreadyExists,
            _ => FailureCategory::Other,
        }
    }

    /// Wraps the failure with the apology shown to the user.
    pub fn apology(self, apology: impl Into<String>) -> HandlerError {
        HandlerError::external(apology, FailureCategory::Other, self.to_string())
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
                body: err.without_url().to_string(),
            },
            None => Self::Request(err.without_url().to_string()),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<image::ImageError> for ToolError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<ToolError> for HandlerError {
    fn from(err: ToolError) -> Self {
        HandlerError::tool(err)
    }
}

/// Result type for tools.
pub type ToolResult<T> = Result<T, ToolError>;
