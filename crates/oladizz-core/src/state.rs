//! Per-chat conversation state.
//!
//! The persisted unit is a JSON object ([`Document`]) keyed by chat. The
//! `action` field names the pending step; every other field is scratch data
//! owned by that step, except for the credential fields listed in
//! [`fields::RETAINED`], which outlive individual operations.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::action::ActionTag;
use crate::ids::ChatId;

/// A stored state record.
pub type Document = Map<String, Value>;

/// Well-known document field names.
pub mod fields {
    /// The pending action tag.
    pub const ACTION: &str = "action";
    /// Accumulated photo file ids.
    pub const IMAGES: &str = "images";
    /// Target image format.
    pub const FORMAT: &str = "format";
    /// Requested number of video frames.
    pub const FRAME_COUNT: &str = "frameCount";
    /// A received file awaiting a follow-up step.
    pub const FILE_ID: &str = "file_id";
    pub const FILE_NAME: &str = "file_name";
    /// Stored API keys by service name.
    pub const API_KEYS: &str = "api_keys";
    /// GitHub personal access token.
    pub const GITHUB_PAT: &str = "github_pat";
    /// AI chat transcript.
    pub const CHAT_HISTORY: &str = "chat_history";

    // Deep-search wizard.
    pub const QUERY: &str = "query";
    pub const LANGUAGE: &str = "language";
    pub const MIN_STARS: &str = "minStars";
    pub const SORT: &str = "sort";

    /// Fields that survive Replace and Clear transitions.
    pub const RETAINED: &[&str] = &[API_KEYS, GITHUB_PAT];
}

/// The decoded `action` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSlot {
    /// No pending operation.
    Idle,
    /// A known action is pending.
    Pending(ActionTag),
    /// The stored value names no known action.
    Stale(String),
}

impl ActionSlot {
    /// Decodes the `action` field of a document.
    pub fn from_document(doc: &Document) -> Self {
        match doc.get(fields::ACTION) {
            None | Some(Value::Null) => Self::Idle,
            Some(Value::String(raw)) => match raw.parse::<ActionTag>() {
                Ok(tag) => Self::Pending(tag),
                Err(_) => Self::Stale(raw.clone()),
            },
            Some(other) => Self::Stale(other.to_string()),
        }
    }

    /// Returns the pending tag, if any.
    pub fn tag(&self) -> Option<ActionTag> {
        match self {
            Self::Pending(tag) => Some(*tag),
            _ => None,
        }
    }

    /// Returns `true` when any action value is present, stale or not.
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// A snapshot of one chat's state as loaded at the start of an event.
#[derive(Debug, Clone)]
pub struct ChatState {
    chat: ChatId,
    exists: bool,
    action: ActionSlot,
    scratch: Scratch,
}

impl ChatState {
    /// Builds the snapshot from a loaded record (or its absence).
    pub fn from_document(chat: ChatId, doc: Option<Document>) -> Self {
        match doc {
            None => Self::absent(chat),
            Some(mut doc) => {
                let action = ActionSlot::from_document(&doc);
                doc.remove(fields::ACTION);
                Self {
                    chat,
                    exists: true,
                    action,
                    scratch: Scratch(doc),
                }
            }
        }
    }

    /// The snapshot of a chat with no record.
    pub fn absent(chat: ChatId) -> Self {
        Self {
            chat,
            exists: false,
            action: ActionSlot::Idle,
            scratch: Scratch::default(),
        }
    }

    pub fn chat(&self) -> ChatId {
        self.chat
    }

    /// Returns `true` if a record exists for this chat.
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn action(&self) -> &ActionSlot {
        &self.action
    }

    pub fn scratch(&self) -> &Scratch {
        &self.scratch
    }
}

/// Read-only view of action-specific working data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scratch(Document);

impl Scratch {
    /// Wraps a raw document.
    pub fn new(doc: Document) -> Self {
        Self(doc)
    }

    /// Returns the raw field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn u64(&self, field: &str) -> Option<u64> {
        self.0.get(field).and_then(Value::as_u64)
    }

    /// Returns the string elements of an array field, in order.
    pub fn strings(&self, field: &str) -> Vec<String> {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the stored API keys by service name.
    pub fn api_keys(&self) -> BTreeMap<String, String> {
        self.0
            .get(fields::API_KEYS)
            .and_then(Value::as_object)
            .map(|keys| {
                keys.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the stored API key for one service.
    pub fn api_key(&self, service: &str) -> Option<&str> {
        self.0
            .get(fields::API_KEYS)
            .and_then(|keys| keys.get(service))
            .and_then(Value::as_str)
    }

    pub fn github_token(&self) -> Option<&str> {
        self.str(fields::GITHUB_PAT)
    }

    /// Returns the underlying document.
    pub fn as_document(&self) -> &Document {
        &self.0
    }

    pub fn into_document(self) -> Document {
        self.0
    }
}
