//! HTTP access to the Bot API.
//!
//! Every method is a POST to `{api_base}/bot{token}/{method}` answered with
//! the `{ ok, result }` envelope. The token is part of every URL, so errors
//! are stripped of their URL before they leave this module.

use reqwest::multipart::Form;
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use oladizz_core::{ApiError, ApiResult};

use crate::config::TelegramSettings;
use crate::model::ApiResponse;

/// Makes Bot API calls with one shared connection pool.
#[derive(Clone)]
pub struct ApiCaller {
    client: Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for ApiCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCaller")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl ApiCaller {
    pub fn new(settings: &TelegramSettings) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(transport)?;

        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Download URL of a file path returned by `getFile`.
    pub fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    /// Calls `method` with a JSON body.
    pub async fn call<P, T>(&self, method: &str, params: &P) -> ApiResult<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(method = %method, "Calling Bot API");
        let response = self
            .client
            .post(self.method_url(method))
            .json(params)
            .send()
            .await
            .map_err(transport)?;
        decode(method, response).await
    }

    /// Calls `method` with a multipart body (file uploads).
    pub async fn upload<T: DeserializeOwned>(&self, method: &str, form: Form) -> ApiResult<T> {
        debug!(method = %method, "Uploading via Bot API");
        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        decode(method, response).await
    }

    /// Fetches raw bytes, failing on a non-success status.
    pub async fn download(&self, url: &str) -> ApiResult<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Rejected {
                code: i64::from(status.as_u16()),
                message: format!("file download failed with HTTP {status}"),
            });
        }
        let bytes = response.bytes().await.map_err(transport)?;
        trace!(len = bytes.len(), "Downloaded file");
        Ok(bytes.to_vec())
    }
}

async fn decode<T: DeserializeOwned>(method: &str, response: Response) -> ApiResult<T> {
    let status = response.status();
    let body = response.bytes().await.map_err(transport)?;

    let envelope: ApiResponse<T> = serde_json::from_slice(&body).map_err(|e| {
        ApiError::Serialization(format!("{method}: {e} (HTTP {status})"))
    })?;

    if envelope.ok {
        return envelope
            .result
            .ok_or_else(|| ApiError::Serialization(format!("{method}: response has no result")));
    }

    let mut message = envelope
        .description
        .unwrap_or_else(|| format!("HTTP {status}"));
    if let Some(retry) = envelope.parameters.and_then(|p| p.retry_after) {
        message.push_str(&format!(" (retry after {retry}s)"));
    }
    Err(ApiError::Rejected {
        code: envelope
            .error_code
            .unwrap_or_else(|| i64::from(status.as_u16())),
        message,
    })
}

/// Converts a reqwest error without its URL, which carries the token.
fn transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(err.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let caller = ApiCaller::new(&TelegramSettings::new("123:abc").api_base("http://bot.test/"))
            .unwrap();
        assert_eq!(caller.method_url("getMe"), "http://bot.test/bot123:abc/getMe");
        assert_eq!(
            caller.file_url("photos/file_1.jpg"),
            "http://bot.test/file/bot123:abc/photos/file_1.jpg"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let caller = ApiCaller::new(&TelegramSettings::new("123:secret")).unwrap();
        assert!(!format!("{caller:?}").contains("secret"));
    }
}
