//! Error types for the Oladizz framework.

use oladizz_core::{ActionTag, ApiError, EventKind, StoreError};
use thiserror::Error;

use crate::replies;
use crate::step::Step;

// =============================================================================
// Handler errors
// =============================================================================

/// Coarse reason attached to an external failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    NotFound,
    AuthFailed,
    AlreadyExists,
    Other,
}

impl FailureCategory {
    /// User-facing reason, if the category has one.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::NotFound => Some("The requested resource was not found."),
            Self::AuthFailed => Some("Authentication failed. Please check your token or key."),
            Self::AlreadyExists => Some("It already exists."),
            Self::Other => None,
        }
    }
}

/// Errors a handler may return.
///
/// Every variant maps to a user-facing reply and a transition, so a failing
/// handler never leaves the chat without an answer or stuck in a step.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Malformed user input. The step stays in place for a retry.
    #[error("invalid input: {message}")]
    Validation { message: String },

    /// A remote API or conversion tool failed.
    #[error("{apology} ({category:?}): {detail}")]
    External {
        apology: String,
        category: FailureCategory,
        detail: String,
    },

    /// The state store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The messaging platform rejected a call.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A local tool or service failed.
    #[error("tool error: {0}")]
    Tool(String),
}

impl HandlerError {
    /// Creates a validation error carrying the corrective prompt.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an external failure.
    pub fn external(
        apology: impl Into<String>,
        category: FailureCategory,
        detail: impl Into<String>,
    ) -> Self {
        Self::External {
            apology: apology.into(),
            category,
            detail: detail.into(),
        }
    }

    /// Creates a tool failure.
    pub fn tool(detail: impl std::fmt::Display) -> Self {
        Self::Tool(detail.to_string())
    }

    /// Returns the failure category, if this is an external failure.
    pub fn category(&self) -> Option<FailureCategory> {
        match self {
            Self::External { category, .. } => Some(*category),
            _ => None,
        }
    }

    /// The reply shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message } => message.clone(),
            Self::External {
                apology, category, ..
            } => match category.reason() {
                Some(reason) => format!("{apology}\nReason: {reason}"),
                None => apology.clone(),
            },
            Self::Store(_) => replies::TRY_AGAIN.to_string(),
            Self::Api(_) | Self::Tool(_) => replies::GENERIC_FAILURE.to_string(),
        }
    }

    /// Converts the failure into the step the engine commits.
    pub fn into_step(self) -> Step {
        let message = self.user_message();
        match self {
            Self::Validation { .. } | Self::Store(_) => Step::no_change().reply(message),
            Self::External { .. } | Self::Api(_) | Self::Tool(_) => Step::clear().reply(message),
        }
    }
}

/// Result type for handlers.
pub type HandlerResult<T = Step> = Result<T, HandlerError>;

// =============================================================================
// Startup errors
// =============================================================================

/// Errors detected while assembling the engine.
#[derive(Debug, Clone, Error)]
pub enum FrameworkError {
    /// An action tag has no handler for any event kind.
    #[error("no handler registered for action '{0}'")]
    UnregisteredAction(ActionTag),

    /// Two handlers were registered for the same tag and event kind.
    #[error("duplicate handler for action '{tag}' on {kind} events")]
    DuplicateHandler { tag: ActionTag, kind: EventKind },

    /// A menu entry starts an action that has no handler.
    #[error("menu entry '{entry}' starts unregistered action '{action}'")]
    UnhandledMenuAction { entry: String, action: ActionTag },

    /// A menu button points to a selection nothing routes.
    #[error("menu '{menu}' has a button for unknown selection '{selection}'")]
    DanglingButton { menu: String, selection: String },
}

/// Result type for engine assembly.
pub type FrameworkResult<T> = Result<T, FrameworkError>;
