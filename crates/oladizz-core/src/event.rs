//! Inbound event model.
//!
//! Adapters translate platform updates into [`InboundEvent`]s. The engine only
//! ever sees this normalized form: a chat identity plus one of six payload
//! kinds.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ids::{ChatId, FileRef, MessageId};

/// Callback invoked by an adapter for every normalized event.
pub type EventSink = Arc<dyn Fn(InboundEvent) + Send + Sync>;

// =============================================================================
// EventKind
// =============================================================================

/// Discriminant of an [`EventPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Text,
    Photo,
    Document,
    Audio,
    Video,
    Callback,
}

impl EventKind {
    /// Every event kind, in declaration order.
    pub const ALL: [EventKind; 6] = [
        Self::Text,
        Self::Photo,
        Self::Document,
        Self::Audio,
        Self::Video,
        Self::Callback,
    ];

    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Photo => "photo",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Callback => "callback",
        }
    }

    /// Human-readable noun used in user-facing hints.
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Text => "a text message",
            Self::Photo => "a photo",
            Self::Document => "a file",
            Self::Audio => "an audio file",
            Self::Video => "a video",
            Self::Callback => "a button press",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payload / Event
// =============================================================================

/// Event-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    Text {
        text: String,
    },
    /// The largest available size of a photo.
    Photo {
        file: FileRef,
    },
    Document {
        file: FileRef,
    },
    Audio {
        file: FileRef,
    },
    Video {
        file: FileRef,
    },
    /// An inline button press on a message previously sent by the bot.
    Callback {
        callback_id: String,
        data: String,
        #[serde(default)]
        message_id: Option<MessageId>,
    },
}

/// A normalized inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub chat: ChatId,
    /// The user's message, if the event carries one. Callback events use the
    /// id of the message that holds the keyboard instead.
    #[serde(default)]
    pub message_id: Option<MessageId>,
    pub payload: EventPayload,
}

impl InboundEvent {
    /// Creates a text event.
    pub fn text(chat: impl Into<ChatId>, text: impl Into<String>) -> Self {
        Self {
            chat: chat.into(),
            message_id: None,
            payload: EventPayload::Text { text: text.into() },
        }
    }

    /// Creates a callback event.
    pub fn callback(chat: impl Into<ChatId>, data: impl Into<String>) -> Self {
        Self {
            chat: chat.into(),
            message_id: None,
            payload: EventPayload::Callback {
                callback_id: String::new(),
                data: data.into(),
                message_id: None,
            },
        }
    }

    /// Creates a file-bearing event of the given kind.
    ///
    /// `Text` and `Callback` are not file kinds and yield an empty text event.
    pub fn file(chat: impl Into<ChatId>, kind: EventKind, file: FileRef) -> Self {
        let payload = match kind {
            EventKind::Photo => EventPayload::Photo { file },
            EventKind::Document => EventPayload::Document { file },
            EventKind::Audio => EventPayload::Audio { file },
            EventKind::Video => EventPayload::Video { file },
            EventKind::Text | EventKind::Callback => EventPayload::Text {
                text: String::new(),
            },
        };
        Self {
            chat: chat.into(),
            message_id: None,
            payload,
        }
    }

    /// Sets the message id (builder pattern).
    pub fn with_message_id(mut self, id: MessageId) -> Self {
        self.message_id = Some(id);
        self
    }

    /// Returns the payload discriminant.
    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::Text { .. } => EventKind::Text,
            EventPayload::Photo { .. } => EventKind::Photo,
            EventPayload::Document { .. } => EventKind::Document,
            EventPayload::Audio { .. } => EventKind::Audio,
            EventPayload::Video { .. } => EventKind::Video,
            EventPayload::Callback { .. } => EventKind::Callback,
        }
    }

    /// Returns the text content of a text event.
    pub fn text_content(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns the file reference of a file-bearing event.
    pub fn file_ref(&self) -> Option<&FileRef> {
        match &self.payload {
            EventPayload::Photo { file }
            | EventPayload::Document { file }
            | EventPayload::Audio { file }
            | EventPayload::Video { file } => Some(file),
            _ => None,
        }
    }

    /// Returns the button payload of a callback event.
    pub fn callback_data(&self) -> Option<&str> {
        match &self.payload {
            EventPayload::Callback { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Returns the id of the message holding the pressed keyboard.
    pub fn callback_message(&self) -> Option<MessageId> {
        match &self.payload {
            EventPayload::Callback { message_id, .. } => *message_id,
            _ => None,
        }
    }

    /// Parses the event as a control command, if it is one.
    pub fn command(&self) -> Option<Command> {
        self.text_content().and_then(Command::parse)
    }
}

// =============================================================================
// Command
// =============================================================================

/// A control command. Commands bypass state routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    EndChat,
    /// Any other `/word`.
    Unknown(String),
}

impl Command {
    /// The reserved control prefix.
    pub const PREFIX: char = '/';

    /// Parses the first token of `text` as a command.
    ///
    /// Returns `None` if the text does not start with the control prefix.
    /// A `@botname` suffix on the token is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.trim_start().strip_prefix(Self::PREFIX)?;
        let token = token.split_whitespace().next().unwrap_or("");
        let name = token.split('@').next().unwrap_or("").to_ascii_lowercase();

        Some(match name.as_str() {
            "start" => Self::Start,
            "cancel" => Self::Cancel,
            "endchat" => Self::EndChat,
            _ => Self::Unknown(name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("  /cancel now"), Some(Command::Cancel));
        assert_eq!(Command::parse("/EndChat@oladizz_bot"), Some(Command::EndChat));
        assert_eq!(
            Command::parse("/help"),
            Some(Command::Unknown("help".to_string()))
        );
        assert_eq!(Command::parse("hello /start"), None);
        assert_eq!(Command::parse("done"), None);
    }

    #[test]
    fn test_event_accessors() {
        let event = InboundEvent::file(7, EventKind::Photo, FileRef::new("abc"));
        assert_eq!(event.kind(), EventKind::Photo);
        assert_eq!(event.file_ref().map(|f| f.file_id.as_str()), Some("abc"));
        assert!(event.text_content().is_none());
        assert!(event.command().is_none());

        let cb = InboundEvent::callback(7, "pdf_tools");
        assert_eq!(cb.kind(), EventKind::Callback);
        assert_eq!(cb.callback_data(), Some("pdf_tools"));
    }
}
