//! Google Gemini chat client.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use super::Http;
use crate::error::ToolError;

/// Instruction sent with every conversation.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Speaker of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry as stored in `chat_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Parses a stored transcript, skipping malformed entries.
    pub fn parse_history(value: Option<&Value>) -> Vec<ChatTurn> {
        value
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn wire(&self) -> Value {
        let role = match self.role {
            Role::User => "user",
            Role::Assistant => "model",
        };
        json!({ "role": role, "parts": [{ "text": self.content }] })
    }
}

/// Why a chat turn failed.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// The service rejected the request.
    #[error("HTTP {status}")]
    Status {
        status: u16,
        /// `error.message` from the body, if it was JSON.
        message: Option<String>,
    },

    /// The answer had no text.
    #[error("empty response")]
    Empty,

    /// The answer was not the expected JSON.
    #[error("unparsable response: {0}")]
    Parse(String),

    #[error(transparent)]
    Transport(ToolError),
}

impl GeminiError {
    /// 400 and 403 mean the key itself is bad.
    pub fn is_invalid_key(&self) -> bool {
        matches!(self, Self::Status { status: 400 | 403, .. })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Http,
    base: String,
    model: String,
}

impl GeminiClient {
    pub fn new(http: Http, base: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends the transcript plus `message` and returns the reply text.
    pub async fn chat(
        &self,
        key: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, GeminiError> {
        let mut contents: Vec<Value> = history.iter().map(ChatTurn::wire).collect();
        contents.push(ChatTurn::user(message).wire());
        let body = json!({
            "contents": contents,
            "system_instruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
        });

        let url = format!("{}/v1beta/models/{}:generateContent", self.base, self.model);
        debug!(model = %self.model, turns = contents.len(), "Calling Gemini");
        let response = self
            .http
            .client()
            .post(url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| GeminiError::Transport(e.into()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GeminiError::Transport(e.into()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string));
            return Err(GeminiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| GeminiError::Parse(e.to_string()))?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .filter(|t| !t.trim().is_empty())
            .ok_or(GeminiError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::testing::FakeServer;

    const PATH: &str = "POST /v1beta/models/gemini-2.5-flash:generateContent";

    async fn client(server: &FakeServer) -> GeminiClient {
        let settings = server.settings();
        GeminiClient::new(
            Http::new(&settings).unwrap(),
            settings.endpoints.gemini_api,
            settings.endpoints.gemini_model,
        )
    }

    #[tokio::test]
    async fn test_chat_sends_history_and_system_prompt() {
        let server = FakeServer::start().await;
        server.route(
            PATH,
            200,
            r#"{"candidates":[{"content":{"parts":[{"text":"Hi there"}]}}]}"#,
        );
        let history = vec![ChatTurn::user("hello"), ChatTurn::assistant("hey")];
        let reply = client(&server).await.chat("k1", &history, "how are you").await.unwrap();
        assert_eq!(reply, "Hi there");

        let seen = &server.seen()[0];
        assert_eq!(seen.query, "key=k1");
        let body: Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "how are you");
        assert_eq!(body["system_instruction"]["parts"][0]["text"], SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_error_status_and_empty_answer() {
        let server = FakeServer::start().await;
        server.route(PATH, 403, r#"{"error":{"message":"API key not valid"}}"#);
        let err = client(&server).await.chat("bad", &[], "hi").await.unwrap_err();
        assert!(err.is_invalid_key());
        assert!(matches!(err, GeminiError::Status { message: Some(ref m), .. } if m == "API key not valid"));

        server.route(PATH, 200, r#"{"candidates":[]}"#);
        let err = client(&server).await.chat("k", &[], "hi").await.unwrap_err();
        assert!(matches!(err, GeminiError::Empty));
    }

    #[test]
    fn test_history_skips_malformed_entries() {
        let stored = json!([
            { "role": "user", "content": "a" },
            { "role": "system" },
            { "role": "assistant", "content": "b" }
        ]);
        assert_eq!(
            ChatTurn::parse_history(Some(&stored)),
            vec![ChatTurn::user("a"), ChatTurn::assistant("b")]
        );
    }
}
