//! Telegram implementation of [`Outbound`].
//!
//! ```rust,ignore
//! use oladizz_adapter_telegram::{TelegramBot, TelegramSettings};
//!
//! let bot = TelegramBot::new(&TelegramSettings::new(token))?;
//! let me = bot.get_me().await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use oladizz_core::{
    ApiError, ApiResult, ChatAction, ChatId, FileKind, MessageId, Outbound, OutboundFile, Reply,
    TextFormat,
};

use crate::api_caller::ApiCaller;
use crate::config::TelegramSettings;
use crate::model::{
    AnswerCallbackQuery, EditMessageText, File, GetFile, InlineKeyboardMarkup, LinkPreviewOptions,
    Me, MessageRef, SendChatAction, SendMessage, SentMessage,
};

/// Longest text Telegram accepts in one message.
pub const MAX_MESSAGE_CHARS: usize = 4096;

// =============================================================================
// TelegramBot
// =============================================================================

/// Sends messages and files through the Bot API.
#[derive(Debug, Clone)]
pub struct TelegramBot {
    caller: Arc<ApiCaller>,
}

impl TelegramBot {
    pub fn new(settings: &TelegramSettings) -> ApiResult<Self> {
        Ok(Self {
            caller: Arc::new(ApiCaller::new(settings)?),
        })
    }

    /// Shares the underlying caller, e.g. with [`LongPolling`](crate::LongPolling).
    pub fn caller(&self) -> Arc<ApiCaller> {
        self.caller.clone()
    }

    /// Checks the token and returns the bot's identity.
    pub async fn get_me(&self) -> ApiResult<Me> {
        self.caller.call("getMe", &serde_json::json!({})).await
    }

    async fn get_file(&self, file_id: &str) -> ApiResult<File> {
        self.caller.call("getFile", &GetFile { file_id }).await
    }
}

fn parse_mode(format: TextFormat) -> Option<&'static str> {
    match format {
        TextFormat::Plain => None,
        TextFormat::Markdown => Some("Markdown"),
    }
}

fn preview(reply: &Reply) -> Option<LinkPreviewOptions> {
    reply
        .disable_preview
        .then_some(LinkPreviewOptions { is_disabled: true })
}

/// Splits `text` into chunks of at most `max_chars` characters, cutting after
/// the last newline of a chunk when there is one.
pub fn split_message(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);
        let cut = match rest[..limit].rfind('\n') {
            Some(i) if i > 0 => i + 1,
            _ => limit,
        };
        chunks.push(&rest[..cut]);
        rest = &rest[cut..];
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest);
    }
    chunks
}

fn is_not_modified(err: &ApiError) -> bool {
    matches!(err, ApiError::Rejected { message, .. } if message.contains("message is not modified"))
}

// =============================================================================
// Outbound Implementation
// =============================================================================

#[async_trait]
impl Outbound for TelegramBot {
    async fn send_text(&self, chat: ChatId, reply: &Reply) -> ApiResult<MessageId> {
        let chunks = split_message(&reply.text, MAX_MESSAGE_CHARS);
        if chunks.len() > 1 {
            debug!(chat = %chat, parts = chunks.len(), "Splitting long message");
        }

        let last = chunks.len() - 1;
        let mut sent = MessageId(0);
        for (i, chunk) in chunks.into_iter().enumerate() {
            // The keyboard belongs under the final part.
            let reply_markup = if i == last {
                reply.keyboard.as_ref().map(InlineKeyboardMarkup::from)
            } else {
                None
            };
            let message: SentMessage = self
                .caller
                .call(
                    "sendMessage",
                    &SendMessage {
                        chat_id: chat.0,
                        text: chunk,
                        parse_mode: parse_mode(reply.format),
                        reply_markup,
                        link_preview_options: preview(reply),
                    },
                )
                .await?;
            sent = MessageId(message.message_id);
        }
        Ok(sent)
    }

    async fn edit_text(&self, chat: ChatId, message: MessageId, reply: &Reply) -> ApiResult<()> {
        let params = EditMessageText {
            chat_id: chat.0,
            message_id: message.0,
            text: &reply.text,
            parse_mode: parse_mode(reply.format),
            reply_markup: reply.keyboard.as_ref().map(InlineKeyboardMarkup::from),
            link_preview_options: preview(reply),
        };
        match self
            .caller
            .call::<_, serde_json::Value>("editMessageText", &params)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_modified(&e) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn send_file(&self, chat: ChatId, file: &OutboundFile) -> ApiResult<MessageId> {
        let (method, field) = match file.kind {
            FileKind::Document => ("sendDocument", "document"),
            FileKind::Photo => ("sendPhoto", "photo"),
            FileKind::Audio => ("sendAudio", "audio"),
            FileKind::Sticker => ("sendSticker", "sticker"),
        };

        let bytes = tokio::fs::read(&file.path).await?;
        let name = file
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        debug!(chat = %chat, method, file = %name, len = bytes.len(), "Uploading file");

        let mut form = Form::new()
            .text("chat_id", chat.0.to_string())
            .part(field, Part::bytes(bytes).file_name(name));
        match (&file.caption, file.kind) {
            (Some(_), FileKind::Sticker) => warn!("Stickers cannot carry a caption, dropping it"),
            (Some(caption), _) => form = form.text("caption", caption.clone()),
            (None, _) => {}
        }

        let message: SentMessage = self.caller.upload(method, form).await?;
        Ok(MessageId(message.message_id))
    }

    async fn delete_message(&self, chat: ChatId, message: MessageId) -> ApiResult<()> {
        self.caller
            .call::<_, bool>(
                "deleteMessage",
                &MessageRef {
                    chat_id: chat.0,
                    message_id: message.0,
                },
            )
            .await
            .map(drop)
    }

    async fn file_url(&self, file_id: &str) -> ApiResult<String> {
        let file = self.get_file(file_id).await?;
        let path = file
            .file_path
            .ok_or_else(|| ApiError::Other(format!("file {file_id} cannot be downloaded")))?;
        Ok(self.caller.file_url(&path))
    }

    async fn download_file(&self, file_id: &str) -> ApiResult<Vec<u8>> {
        let url = self.file_url(file_id).await?;
        self.caller.download(&url).await
    }

    async fn answer_callback(&self, callback_id: &str) -> ApiResult<()> {
        self.caller
            .call::<_, bool>(
                "answerCallbackQuery",
                &AnswerCallbackQuery {
                    callback_query_id: callback_id,
                },
            )
            .await
            .map(drop)
    }

    async fn send_chat_action(&self, chat: ChatId, action: ChatAction) -> ApiResult<()> {
        self.caller
            .call::<_, bool>(
                "sendChatAction",
                &SendChatAction {
                    chat_id: chat.0,
                    action: action.as_str(),
                },
            )
            .await
            .map(drop)
    }
}
