//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OladizzConfig {
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Bot API credentials and polling behaviour.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Where per-chat state lives.
    #[serde(default)]
    pub store: StoreConfig,

    /// Event processing and background work.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// The liveness endpoint.
    #[serde(default)]
    pub health: HealthConfig,

    /// External binaries and remote services used by feature handlers.
    #[serde(default)]
    pub tools: ToolsConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Every accepted level name.
    pub const NAMES: [&'static str; 5] = ["trace", "debug", "info", "warn", "error"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line format of log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level, overridden by `RUST_LOG` when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids in each line.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line in each line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file, used when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-module levels, e.g. `oladizz_framework = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::Never,
            filters: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Telegram
// =============================================================================

/// Bot API settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather.
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Long-poll wait passed to `getUpdates`.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Per-request timeout. Must exceed the poll timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("api_base", &self.api_base)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
            poll_timeout_secs: default_poll_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl TelegramConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    60
}

// =============================================================================
// Store
// =============================================================================

/// State store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Lost on restart.
    Memory,
    /// One JSON document per chat under `data_dir`.
    #[default]
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/chats")
}

// =============================================================================
// Runtime
// =============================================================================

/// Event processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Root for temporary artifacts.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Upper bound for one background task.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    /// Events handled at the same time.
    #[serde(default = "default_max_concurrent_events")]
    pub max_concurrent_events: usize,

    /// How long shutdown waits for in-flight work.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            task_timeout_secs: default_task_timeout_secs(),
            max_concurrent_events: default_max_concurrent_events(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl RuntimeConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("oladizz")
}

fn default_task_timeout_secs() -> u64 {
    300
}

fn default_max_concurrent_events() -> usize {
    64
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

// =============================================================================
// Health
// =============================================================================

/// Plain-text liveness endpoint for hosting platforms that check a port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_health_body")]
    pub body: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_port(),
            body: default_health_body(),
        }
    }
}

impl HealthConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_health_body() -> String {
    "Oladizz bot (telegram) is running!".to_string()
}

// =============================================================================
// Tools
// =============================================================================

/// External programs and remote endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// Probes video duration before frame extraction.
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,

    #[serde(default = "default_tesseract")]
    pub tesseract: String,

    /// ImageMagick, used to bind images into a PDF.
    #[serde(default = "default_magick")]
    pub magick: String,

    #[serde(default = "default_qrencode")]
    pub qrencode: String,

    /// Headless browser for screenshots and HTML-to-PDF.
    #[serde(default = "default_chromium")]
    pub chromium: String,

    #[serde(default = "default_zip")]
    pub zip: String,

    /// Timeout for every outgoing HTTP request.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_github_api")]
    pub github_api: String,

    #[serde(default = "default_gemini_api")]
    pub gemini_api: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_npm_registry")]
    pub npm_registry: String,

    #[serde(default = "default_tinyurl_api")]
    pub tinyurl_api: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            tesseract: default_tesseract(),
            magick: default_magick(),
            qrencode: default_qrencode(),
            chromium: default_chromium(),
            zip: default_zip(),
            http_timeout_secs: default_http_timeout_secs(),
            github_api: default_github_api(),
            gemini_api: default_gemini_api(),
            gemini_model: default_gemini_model(),
            npm_registry: default_npm_registry(),
            tinyurl_api: default_tinyurl_api(),
            user_agent: default_user_agent(),
        }
    }
}

impl ToolsConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// `(name, path)` of every external binary.
    pub fn binaries(&self) -> [(&'static str, &str); 7] {
        [
            ("ffmpeg", self.ffmpeg.as_str()),
            ("ffprobe", self.ffprobe.as_str()),
            ("tesseract", self.tesseract.as_str()),
            ("magick", self.magick.as_str()),
            ("qrencode", self.qrencode.as_str()),
            ("chromium", self.chromium.as_str()),
            ("zip", self.zip.as_str()),
        ]
    }

    /// `(name, url)` of every remote endpoint base.
    pub fn endpoints(&self) -> [(&'static str, &str); 4] {
        [
            ("github_api", self.github_api.as_str()),
            ("gemini_api", self.gemini_api.as_str()),
            ("npm_registry", self.npm_registry.as_str()),
            ("tinyurl_api", self.tinyurl_api.as_str()),
        ]
    }
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_tesseract() -> String {
    "tesseract".to_string()
}

fn default_magick() -> String {
    "magick".to_string()
}

fn default_qrencode() -> String {
    "qrencode".to_string()
}

fn default_chromium() -> String {
    "chromium".to_string()
}

fn default_zip() -> String {
    "zip".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_gemini_api() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_npm_registry() -> String {
    "https://registry.npmjs.org".to_string()
}

fn default_tinyurl_api() -> String {
    "https://tinyurl.com".to_string()
}

fn default_user_agent() -> String {
    concat!("oladizz/", env!("CARGO_PKG_VERSION")).to_string()
}
