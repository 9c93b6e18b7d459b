//! Tool settings.

use std::time::Duration;

/// Paths of external programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binaries {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub tesseract: String,
    pub magick: String,
    pub qrencode: String,
    pub chromium: String,
    pub zip: String,
}

impl Default for Binaries {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
            ffprobe: "ffprobe".into(),
            tesseract: "tesseract".into(),
            magick: "magick".into(),
            qrencode: "qrencode".into(),
            chromium: "chromium".into(),
            zip: "zip".into(),
        }
    }
}

/// Base URLs of remote services, without trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub github_api: String,
    pub gemini_api: String,
    pub gemini_model: String,
    pub npm_registry: String,
    pub tinyurl_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            github_api: "https://api.github.com".into(),
            gemini_api: "https://generativelanguage.googleapis.com".into(),
            gemini_model: "gemini-2.5-flash".into(),
            npm_registry: "https://registry.npmjs.org".into(),
            tinyurl_api: "https://tinyurl.com".into(),
        }
    }
}

/// Everything the feature layer needs to reach its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub binaries: Binaries,
    pub endpoints: Endpoints,
    pub http_timeout: Duration,
    pub user_agent: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            binaries: Binaries::default(),
            endpoints: Endpoints::default(),
            http_timeout: Duration::from_secs(30),
            user_agent: concat!("oladizz/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ToolSettings {
    /// Points every remote service at `base` (test servers).
    pub fn with_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        self.endpoints.github_api = base.clone();
        self.endpoints.gemini_api = base.clone();
        self.endpoints.npm_registry = base.clone();
        self.endpoints.tinyurl_api = base;
        self
    }
}
