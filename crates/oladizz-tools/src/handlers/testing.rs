//! Shared fixtures for handler tests.
//!
//! [`Harness`] runs the real registry and menu on a memory store, a
//! recording outbound, a [`RecordingToolkit`] and a scripted HTTP server
//! standing in for every remote service.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use oladizz_core::{
    ChatId, Document, EventKind, EventPayload, FileRef, InboundEvent, MemoryStateStore, MessageId,
    StateStore,
};
use oladizz_framework::testing::RecordingOutbound;
use oladizz_framework::{ConversationEngine, Dispatch};
use parking_lot::Mutex;
use serde_json::Value;

use crate::clients::testing::FakeServer;
use crate::clients::{Http, KeyTester};
use crate::error::{ToolError, ToolResult};
use crate::media::{BoxedToolkit, MediaToolkit};

/// A [`MediaToolkit`] that writes marker bytes instead of running programs.
#[derive(Debug, Default)]
pub struct RecordingToolkit {
    calls: Mutex<Vec<String>>,
    fail: Mutex<bool>,
}

impl RecordingToolkit {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Makes every later call fail.
    pub fn fail(&self) {
        *self.fail.lock() = true;
    }

    fn record(&self, call: String) -> ToolResult<()> {
        self.calls.lock().push(call);
        if *self.fail.lock() {
            return Err(ToolError::Process {
                program: "fake".into(),
                code: Some(1),
                stderr: "failed".into(),
            });
        }
        Ok(())
    }
}

async fn contents(path: &Path) -> String {
    String::from_utf8_lossy(&tokio::fs::read(path).await.unwrap_or_default()).into_owned()
}

#[async_trait]
impl MediaToolkit for RecordingToolkit {
    async fn text_to_pdf(&self, text: &str, out: &Path) -> ToolResult<()> {
        self.record(format!("text_to_pdf {text}"))?;
        Ok(tokio::fs::write(out, format!("pdf:{text}")).await?)
    }

    async fn images_to_pdf(&self, images: &[PathBuf], out: &Path) -> ToolResult<()> {
        let mut pages = Vec::new();
        for image in images {
            pages.push(contents(image).await);
        }
        self.record(format!("images_to_pdf {}", pages.join(",")))?;
        Ok(tokio::fs::write(out, format!("pdf:{}", pages.join(","))).await?)
    }

    async fn ocr(&self, image: &Path) -> ToolResult<String> {
        let text = contents(image).await;
        self.record(format!("ocr {text}"))?;
        Ok(text.strip_prefix("text:").unwrap_or_default().to_string())
    }

    async fn qr_code(&self, text: &str, out: &Path) -> ToolResult<()> {
        self.record(format!("qr_code {text}"))?;
        Ok(tokio::fs::write(out, format!("qr:{text}")).await?)
    }

    async fn extract_frames(&self, video: &Path, count: u32, dir: &Path) -> ToolResult<usize> {
        self.record(format!("extract_frames {} {count}", contents(video).await))?;
        for i in 1..=count {
            tokio::fs::write(dir.join(format!("frame-{i:03}.png")), b"frame").await?;
        }
        Ok(count as usize)
    }

    async fn zip_dir(&self, dir: &Path, out: &Path) -> ToolResult<()> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        self.record(format!("zip_dir {}", names.len()))?;
        Ok(tokio::fs::write(out, format!("zip:{}", names.join(","))).await?)
    }

    async fn transcode(&self, input: &Path, out: &Path) -> ToolResult<()> {
        let ext = out.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
        self.record(format!("transcode {} {ext}", contents(input).await))?;
        Ok(tokio::fs::write(out, format!("{ext}:{}", contents(input).await)).await?)
    }

    async fn extract_audio(&self, video: &Path, out: &Path) -> ToolResult<()> {
        self.record(format!("extract_audio {}", contents(video).await))?;
        Ok(tokio::fs::write(out, b"mp3").await?)
    }

    async fn screenshot(&self, url: &str, out: &Path) -> ToolResult<()> {
        let shown = if url.starts_with("file://") { "file" } else { url };
        self.record(format!("screenshot {shown}"))?;
        Ok(tokio::fs::write(out, b"png").await?)
    }

    async fn page_pdf(&self, url: &str, out: &Path) -> ToolResult<()> {
        self.record(format!("page_pdf {url}"))?;
        Ok(tokio::fs::write(out, b"pdf").await?)
    }
}

pub struct Harness {
    pub engine: ConversationEngine,
    pub store: Arc<MemoryStateStore>,
    pub outbound: Arc<RecordingOutbound>,
    pub toolkit: Arc<RecordingToolkit>,
    pub server: FakeServer,
    _temp: tempfile::TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_outbound(RecordingOutbound::new()).await
    }

    /// Uses an outbound with registered downloads.
    pub async fn with_outbound(outbound: RecordingOutbound) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let server = FakeServer::start().await;
        let settings = server.settings();
        let store = Arc::new(MemoryStateStore::new());
        let outbound = Arc::new(outbound);
        let toolkit = Arc::new(RecordingToolkit::default());

        let http = Http::new(&settings).unwrap();
        let tester = KeyTester::new(http)
            .target("openai", server.url("/openai/models"))
            .target("stripe", server.url("/stripe/charges"))
            .target("github", server.url("/user"));
        let services = crate::services_with(&settings, toolkit.clone() as BoxedToolkit)
            .unwrap()
            .with(Arc::new(tester));

        let engine = ConversationEngine::builder(store.clone(), outbound.clone())
            .registry(crate::registry())
            .menu(crate::menu())
            .services(services)
            .temp_dir(temp.path())
            .task_timeout(Duration::from_secs(60))
            .build()
            .unwrap();

        Self {
            engine,
            store,
            outbound,
            toolkit,
            server,
            _temp: temp,
        }
    }

    /// Handles one event and waits for any background task it started.
    pub async fn send(&self, event: InboundEvent) -> Dispatch {
        let dispatch = self.engine.handle(event).await;
        assert!(self.engine.tasks().drain(Duration::from_secs(90)).await);
        dispatch
    }

    pub async fn text(&self, chat: i64, text: &str) -> Dispatch {
        self.send(InboundEvent::text(chat, text).with_message_id(MessageId(7)))
            .await
    }

    pub async fn press(&self, chat: i64, data: &str) -> Dispatch {
        self.send(InboundEvent {
            chat: ChatId(chat),
            message_id: None,
            payload: EventPayload::Callback {
                callback_id: format!("cb-{data}"),
                data: data.to_string(),
                message_id: Some(MessageId(500)),
            },
        })
        .await
    }

    pub async fn file(&self, chat: i64, kind: EventKind, file: FileRef) -> Dispatch {
        self.send(InboundEvent::file(chat, kind, file).with_message_id(MessageId(8)))
            .await
    }

    pub async fn photo(&self, chat: i64, id: &str) -> Dispatch {
        self.file(chat, EventKind::Photo, FileRef::new(id)).await
    }

    pub async fn seed(&self, chat: i64, value: Value) {
        let doc: Document = value.as_object().cloned().unwrap_or_default();
        self.store.set_merge(ChatId(chat), doc).await.unwrap();
    }

    pub async fn doc(&self, chat: i64) -> Option<Value> {
        self.store
            .get(ChatId(chat))
            .await
            .unwrap()
            .map(Value::Object)
    }

    /// The stored action, if any.
    pub async fn action(&self, chat: i64) -> Option<String> {
        self.doc(chat)
            .await
            .and_then(|d| d.get("action").and_then(Value::as_str).map(str::to_string))
    }

    pub fn texts(&self) -> Vec<String> {
        self.outbound.texts()
    }

    pub fn last_text(&self) -> String {
        self.outbound.last_reply().map(|r| r.text).unwrap_or_default()
    }

    /// Names, captions and contents of uploaded files.
    pub fn uploads(&self) -> Vec<(String, Option<String>, String)> {
        self.outbound
            .records()
            .into_iter()
            .filter_map(|r| match r {
                oladizz_framework::testing::Recorded::File {
                    name,
                    caption,
                    bytes,
                    ..
                } => Some((name, caption, String::from_utf8_lossy(&bytes).into_owned())),
                _ => None,
            })
            .collect()
    }
}
