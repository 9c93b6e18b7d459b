//! Outbound messaging surface.
//!
//! [`Outbound`] is everything the engine and handlers may ask of the
//! messaging platform. Concrete adapters (e.g. the Telegram bot) implement it
//! on top of their raw API; tests use a recording implementation.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::ids::{ChatId, MessageId};

/// A type-erased outbound surface.
pub type BoxedOutbound = Arc<dyn Outbound>;

// =============================================================================
// Reply
// =============================================================================

/// Text markup mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextFormat {
    #[default]
    Plain,
    Markdown,
}

/// One inline button; `data` is delivered back as a callback event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// An inline keyboard, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    /// Appends a row (builder pattern).
    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }

    /// Iterates every button's callback data.
    pub fn callbacks(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.data.as_str())
    }
}

/// A text message to send or to edit into place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub format: TextFormat,
    pub keyboard: Option<Keyboard>,
    pub disable_preview: bool,
}

impl Reply {
    /// Creates a plain-text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Creates a Markdown reply.
    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Markdown,
            ..Default::default()
        }
    }

    /// Attaches an inline keyboard.
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Suppresses link previews.
    pub fn without_preview(mut self) -> Self {
        self.disable_preview = true;
        self
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

// =============================================================================
// Files / chat actions
// =============================================================================

/// How an outbound file is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Document,
    Photo,
    Audio,
    Sticker,
}

/// A local file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFile {
    pub kind: FileKind,
    pub path: PathBuf,
    pub caption: Option<String>,
}

impl OutboundFile {
    pub fn new(kind: FileKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            caption: None,
        }
    }

    pub fn document(path: impl Into<PathBuf>) -> Self {
        Self::new(FileKind::Document, path)
    }

    pub fn photo(path: impl Into<PathBuf>) -> Self {
        Self::new(FileKind::Photo, path)
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Transient "bot is doing something" indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
    UploadDocument,
    UploadPhoto,
}

impl ChatAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::UploadDocument => "upload_document",
            Self::UploadPhoto => "upload_photo",
        }
    }
}

// =============================================================================
// Outbound trait
// =============================================================================

/// Operations the bot performs against the messaging platform.
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Sends a text message and returns its id.
    async fn send_text(&self, chat: ChatId, reply: &Reply) -> ApiResult<MessageId>;

    /// Replaces the text and keyboard of a message the bot sent earlier.
    async fn edit_text(&self, chat: ChatId, message: MessageId, reply: &Reply) -> ApiResult<()>;

    /// Uploads a local file and returns the resulting message id.
    async fn send_file(&self, chat: ChatId, file: &OutboundFile) -> ApiResult<MessageId>;

    async fn delete_message(&self, chat: ChatId, message: MessageId) -> ApiResult<()>;

    /// Resolves a received file id to a download URL.
    async fn file_url(&self, file_id: &str) -> ApiResult<String>;

    /// Downloads a received file.
    async fn download_file(&self, file_id: &str) -> ApiResult<Vec<u8>>;

    /// Acknowledges a button press so the client stops its spinner.
    async fn answer_callback(&self, callback_id: &str) -> ApiResult<()>;

    async fn send_chat_action(&self, chat: ChatId, action: ChatAction) -> ApiResult<()>;
}
