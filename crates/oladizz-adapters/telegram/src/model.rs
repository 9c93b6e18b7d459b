//! Bot API wire types.
//!
//! Only the fields the bot reads or writes are modelled; everything else in
//! Telegram's payloads is ignored on deserialization.

use serde::{Deserialize, Serialize};

use oladizz_core::{
    Button, ChatId, EventKind, EventPayload, FileRef, InboundEvent, Keyboard, MessageId,
};

// =============================================================================
// Envelope
// =============================================================================

/// The `{ ok, result | description }` envelope of every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseParameters {
    /// Seconds to wait after a flood-control rejection.
    #[serde(default)]
    pub retry_after: Option<u64>,
}

// =============================================================================
// Updates
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    /// Sizes of one photo, smallest first.
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub document: Option<Attachment>,
    #[serde(default)]
    pub audio: Option<Attachment>,
    #[serde(default)]
    pub video: Option<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// A document, audio file or video.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Attachment {
    fn to_ref(&self) -> FileRef {
        FileRef {
            file_id: self.file_id.clone(),
            file_name: self.file_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// The bot message carrying the keyboard, when still accessible.
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

impl Update {
    /// Normalizes the update, or `None` for kinds the bot does not handle.
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(query) = self.callback_query {
            return query.into_event();
        }
        self.message.and_then(Message::into_event)
    }
}

impl Message {
    pub fn into_event(self) -> Option<InboundEvent> {
        let chat = self.chat.id;
        let message_id = MessageId(self.message_id);

        let event = if let Some(text) = self.text {
            InboundEvent::text(chat, text)
        } else if let Some(largest) = self.photo.as_deref().and_then(largest_photo) {
            InboundEvent::file(chat, EventKind::Photo, FileRef::new(largest.file_id.clone()))
        } else if let Some(doc) = &self.document {
            InboundEvent::file(chat, EventKind::Document, doc.to_ref())
        } else if let Some(audio) = &self.audio {
            InboundEvent::file(chat, EventKind::Audio, audio.to_ref())
        } else if let Some(video) = &self.video {
            InboundEvent::file(chat, EventKind::Video, video.to_ref())
        } else {
            return None;
        };

        Some(event.with_message_id(message_id))
    }
}

impl CallbackQuery {
    fn into_event(self) -> Option<InboundEvent> {
        // Without the original message there is no chat to answer in, except
        // for private chats where the chat id equals the user id.
        let (chat, message) = match &self.message {
            Some(m) => (m.chat.id, Some(MessageId(m.message_id))),
            None => (self.from.id, None),
        };
        Some(InboundEvent {
            chat: ChatId(chat),
            message_id: message,
            payload: EventPayload::Callback {
                callback_id: self.id,
                data: self.data.unwrap_or_default(),
                message_id: message,
            },
        })
    }
}

/// Telegram lists sizes in ascending order; pick by area in case it doesn't.
fn largest_photo(sizes: &[PhotoSize]) -> Option<&PhotoSize> {
    sizes
        .iter()
        .enumerate()
        .max_by_key(|(i, p)| (u64::from(p.width) * u64::from(p.height), *i))
        .map(|(_, p)| p)
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GetUpdates<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    pub allowed_updates: &'a [&'a str],
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl From<&Keyboard> for InlineKeyboardMarkup {
    fn from(keyboard: &Keyboard) -> Self {
        Self {
            inline_keyboard: keyboard
                .rows
                .iter()
                .map(|row| row.iter().map(InlineKeyboardButton::from).collect())
                .collect(),
        }
    }
}

impl From<&Button> for InlineKeyboardButton {
    fn from(button: &Button) -> Self {
        Self {
            text: button.label.clone(),
            callback_data: button.data.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkPreviewOptions {
    pub is_disabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessage<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_preview_options: Option<LinkPreviewOptions>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditMessageText<'a> {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_preview_options: Option<LinkPreviewOptions>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetFile<'a> {
    pub file_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerCallbackQuery<'a> {
    pub callback_query_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendChatAction {
    pub chat_id: i64,
    pub action: &'static str,
}

// =============================================================================
// Results
// =============================================================================

/// The subset of a sent message the bot keeps.
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Me {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}
