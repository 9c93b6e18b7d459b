//! Remote service clients.
//!
//! Every client shares one [`Http`] handle, so the connection pool, timeout
//! and user agent are configured once.

pub mod gemini;
pub mod github;
pub mod key_tester;
pub mod npm;
pub mod page;
pub mod shortener;

use reqwest::{Client, RequestBuilder, Response};
use tracing::trace;

use crate::error::{ToolError, ToolResult};
use crate::settings::ToolSettings;

pub use gemini::{ChatTurn, GeminiClient, GeminiError, Role};
pub use github::{GitHubClient, RepoSearch};
pub use key_tester::{KeyCheck, KeyTester};
pub use npm::{NpmClient, NpmPackage};
pub use page::{PageFetcher, PageMetadata};
pub use shortener::Shortener;

/// Longest error body kept in a [`ToolError::Http`].
const BODY_LIMIT: usize = 500;

/// A configured HTTP client.
#[derive(Debug, Clone)]
pub struct Http {
    client: Client,
}

impl Http {
    pub fn new(settings: &ToolSettings) -> ToolResult<Self> {
        let client = Client::builder()
            .timeout(settings.http_timeout)
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Sends the request, turning a non-success status into [`ToolError::Http`].
    pub async fn send(&self, request: RequestBuilder) -> ToolResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        trace!(status = status.as_u16(), "HTTP response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ToolError::Http {
            status: status.as_u16(),
            body: body.chars().take(BODY_LIMIT).collect(),
        })
    }

    /// GETs a URL as text.
    pub async fn get_text(&self, url: &str) -> ToolResult<String> {
        Ok(self.send(self.client.get(url)).await?.text().await?)
    }

    /// GETs a URL as raw bytes.
    pub async fn get_bytes(&self, url: &str) -> ToolResult<Vec<u8>> {
        Ok(self.send(self.client.get(url)).await?.bytes().await?.to_vec())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A scripted HTTP server for client tests.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::body::Bytes;
    use axum::extract::{Request, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};

    use crate::settings::ToolSettings;

    /// One request as seen by the server.
    #[derive(Debug, Clone)]
    pub struct Seen {
        pub method: String,
        pub path: String,
        pub query: String,
        pub headers: HashMap<String, String>,
        pub body: String,
    }

    #[derive(Default)]
    struct Script {
        routes: HashMap<String, (u16, String)>,
        seen: Vec<Seen>,
    }

    /// Answers `METHOD /path` with canned status and body.
    #[derive(Clone, Default)]
    pub struct FakeServer {
        script: Arc<Mutex<Script>>,
        pub base: String,
    }

    impl FakeServer {
        pub async fn start() -> Self {
            let mut server = Self::default();
            let app = Router::new()
                .fallback(handle)
                .with_state(server.script.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            server.base = format!("http://{}", listener.local_addr().unwrap());
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
            server
        }

        /// Scripts the answer for `"GET /path"`.
        pub fn route(&self, key: &str, status: u16, body: impl Into<String>) -> &Self {
            self.script
                .lock()
                .unwrap()
                .routes
                .insert(key.to_string(), (status, body.into()));
            self
        }

        pub fn seen(&self) -> Vec<Seen> {
            self.script.lock().unwrap().seen.clone()
        }

        pub fn settings(&self) -> ToolSettings {
            ToolSettings::default().with_base(&self.base)
        }

        pub fn url(&self, path: &str) -> String {
            format!("{}{path}", self.base)
        }
    }

    async fn handle(State(script): State<Arc<Mutex<Script>>>, request: Request) -> Response {
        let (parts, body) = request.into_parts();
        let body: Bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
        let key = format!("{} {}", parts.method, parts.uri.path());
        let mut script = script.lock().unwrap();
        script.seen.push(Seen {
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().unwrap_or_default().to_string(),
            headers: parts
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
                .collect(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
        match script.routes.get(&key) {
            Some((status, body)) => (
                StatusCode::from_u16(*status).unwrap(),
                [("content-type", "application/json")],
                body.clone(),
            )
                .into_response(),
            None => (StatusCode::NOT_FOUND, "{}").into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeServer;
    use super::*;

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        let server = FakeServer::start().await;
        server.route("GET /ok", 200, "fine").route("GET /gone", 410, "gone away");
        let http = Http::new(&server.settings()).unwrap();

        assert_eq!(http.get_text(&server.url("/ok")).await.unwrap(), "fine");
        let err = http.get_text(&server.url("/gone")).await.unwrap_err();
        assert!(matches!(err, ToolError::Http { status: 410, ref body } if body == "gone away"));

        let seen = server.seen();
        assert!(seen[0].headers["user-agent"].starts_with("oladizz/"));
    }
}
