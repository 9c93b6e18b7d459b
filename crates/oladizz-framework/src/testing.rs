//! Test doubles.
//!
//! [`RecordingOutbound`] implements [`Outbound`] by appending every call to
//! an in-memory log. Uploaded files are read at send time, so assertions can
//! inspect their content after the handler's temporary artifacts are gone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use oladizz_core::{
    ApiResult, ChatAction, ChatId, FileKind, MessageId, Outbound, OutboundFile, Reply,
};
use parking_lot::Mutex;

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Text {
        chat: ChatId,
        reply: Reply,
    },
    Edit {
        chat: ChatId,
        message: MessageId,
        reply: Reply,
    },
    File {
        chat: ChatId,
        kind: FileKind,
        name: String,
        caption: Option<String>,
        bytes: Vec<u8>,
    },
    Delete {
        chat: ChatId,
        message: MessageId,
    },
    Answer {
        callback_id: String,
    },
    ChatAction {
        chat: ChatId,
        action: ChatAction,
    },
}

/// An [`Outbound`] that records instead of sending.
///
/// Downloads return the bytes registered with
/// [`with_download`](Self::with_download), or the file id itself.
#[derive(Debug)]
pub struct RecordingOutbound {
    log: Mutex<Vec<Recorded>>,
    downloads: Mutex<HashMap<String, Vec<u8>>>,
    next_message: AtomicI64,
}

impl Default for RecordingOutbound {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            downloads: Mutex::new(HashMap::new()),
            next_message: AtomicI64::new(1000),
        }
    }

    /// Registers the bytes served for `file_id`.
    pub fn with_download(self, file_id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.downloads.lock().insert(file_id.into(), bytes.into());
        self
    }

    /// Every recorded call, in order.
    pub fn records(&self) -> Vec<Recorded> {
        self.log.lock().clone()
    }

    /// Texts of sent messages, in order.
    pub fn texts(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|r| match r {
                Recorded::Text { reply, .. } => Some(reply.text.clone()),
                _ => None,
            })
            .collect()
    }

    /// The last sent message.
    pub fn last_reply(&self) -> Option<Reply> {
        self.log.lock().iter().rev().find_map(|r| match r {
            Recorded::Text { reply, .. } => Some(reply.clone()),
            _ => None,
        })
    }

    /// Texts of edited messages, in order.
    pub fn edits(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|r| match r {
                Recorded::Edit { reply, .. } => Some(reply.text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Uploaded files as `(kind, bytes)`, in order.
    pub fn files(&self) -> Vec<(FileKind, Vec<u8>)> {
        self.log
            .lock()
            .iter()
            .filter_map(|r| match r {
                Recorded::File { kind, bytes, .. } => Some((*kind, bytes.clone())),
                _ => None,
            })
            .collect()
    }

    /// Ids of deleted messages, in order.
    pub fn deleted(&self) -> Vec<MessageId> {
        self.log
            .lock()
            .iter()
            .filter_map(|r| match r {
                Recorded::Delete { message, .. } => Some(*message),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }

    fn push(&self, record: Recorded) {
        self.log.lock().push(record);
    }

    fn next_id(&self) -> MessageId {
        MessageId(self.next_message.fetch_add(1, Ordering::Relaxed))
    }
}

#[async_trait]
impl Outbound for RecordingOutbound {
    async fn send_text(&self, chat: ChatId, reply: &Reply) -> ApiResult<MessageId> {
        self.push(Recorded::Text {
            chat,
            reply: reply.clone(),
        });
        Ok(self.next_id())
    }

    async fn edit_text(&self, chat: ChatId, message: MessageId, reply: &Reply) -> ApiResult<()> {
        self.push(Recorded::Edit {
            chat,
            message,
            reply: reply.clone(),
        });
        Ok(())
    }

    async fn send_file(&self, chat: ChatId, file: &OutboundFile) -> ApiResult<MessageId> {
        let bytes = tokio::fs::read(&file.path).await?;
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.push(Recorded::File {
            chat,
            kind: file.kind,
            name,
            caption: file.caption.clone(),
            bytes,
        });
        Ok(self.next_id())
    }

    async fn delete_message(&self, chat: ChatId, message: MessageId) -> ApiResult<()> {
        self.push(Recorded::Delete { chat, message });
        Ok(())
    }

    async fn file_url(&self, file_id: &str) -> ApiResult<String> {
        Ok(format!("https://files.invalid/{file_id}"))
    }

    async fn download_file(&self, file_id: &str) -> ApiResult<Vec<u8>> {
        Ok(self
            .downloads
            .lock()
            .get(file_id)
            .cloned()
            .unwrap_or_else(|| file_id.as_bytes().to_vec()))
    }

    async fn answer_callback(&self, callback_id: &str) -> ApiResult<()> {
        self.push(Recorded::Answer {
            callback_id: callback_id.to_string(),
        });
        Ok(())
    }

    async fn send_chat_action(&self, chat: ChatId, action: ChatAction) -> ApiResult<()> {
        self.push(Recorded::ChatAction { chat, action });
        Ok(())
    }
}
