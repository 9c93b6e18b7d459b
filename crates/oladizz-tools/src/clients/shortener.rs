//! TinyURL shortening.

use super::Http;
use crate::error::{ToolError, ToolResult};

#[derive(Debug, Clone)]
pub struct Shortener {
    http: Http,
    base: String,
}

impl Shortener {
    pub fn new(http: Http, base: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the short link.
    ///
    /// The service answers in plain text; a body that is not a URL is its
    /// error message and comes back as [`ToolError::Decode`].
    pub async fn shorten(&self, url: &str) -> ToolResult<String> {
        let response = self
            .http
            .client()
            .get(format!("{}/api-create.php", self.base))
            .query(&[("url", url)])
            .send()
            .await?;
        let body = response.text().await?;
        let body = body.trim();
        if body.starts_with("http") {
            Ok(body.to_string())
        } else {
            Err(ToolError::Decode(body.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::testing::FakeServer;

    #[tokio::test]
    async fn test_shorten_and_error_body() {
        let server = FakeServer::start().await;
        server.route("GET /api-create.php", 200, "https://tinyurl.com/abc\n");
        let settings = server.settings();
        let shortener = Shortener::new(Http::new(&settings).unwrap(), settings.endpoints.tinyurl_api);
        assert_eq!(
            shortener.shorten("https://example.com/long").await.unwrap(),
            "https://tinyurl.com/abc"
        );
        assert_eq!(server.seen()[0].query, "url=https%3A%2F%2Fexample.com%2Flong");

        server.route("GET /api-create.php", 400, "Error");
        let err = shortener.shorten("https://example.com").await.unwrap_err();
        assert!(matches!(err, ToolError::Decode(ref body) if body == "Error"));
    }
}
