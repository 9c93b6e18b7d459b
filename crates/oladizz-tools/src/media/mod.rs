//! Media conversion.
//!
//! Rendering work the bot does not implement itself (PDF layout,
//! transcoding, OCR, QR codes, headless browsing) goes through the
//! [`MediaToolkit`] trait. [`ExternalToolkit`] implements it with external
//! programs; tests substitute a recording double.
//!
//! Image re-encoding is done in-process, see [`imaging`].

pub mod external;
pub mod imaging;
pub mod process;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ToolResult;

pub use external::ExternalToolkit;
pub use imaging::TargetFormat;

/// Shared toolkit handle, registered as a service.
pub type BoxedToolkit = Arc<dyn MediaToolkit>;

/// Conversions delegated to external programs.
///
/// Every method writes its result to `out` (or into `dir`); the caller owns
/// those paths and removes them.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Lays out plain text on PDF pages.
    async fn text_to_pdf(&self, text: &str, out: &Path) -> ToolResult<()>;

    /// Binds images into one PDF, one page per image, in order.
    async fn images_to_pdf(&self, images: &[PathBuf], out: &Path) -> ToolResult<()>;

    /// Recognizes text in an image.
    async fn ocr(&self, image: &Path) -> ToolResult<String>;

    /// Renders `text` as a QR code PNG.
    async fn qr_code(&self, text: &str, out: &Path) -> ToolResult<()>;

    /// Extracts `count` evenly spaced frames as PNG files into `dir`.
    ///
    /// Returns the number of frames written.
    async fn extract_frames(&self, video: &Path, count: u32, dir: &Path) -> ToolResult<usize>;

    /// Packs the files in `dir` into a ZIP archive.
    async fn zip_dir(&self, dir: &Path, out: &Path) -> ToolResult<()>;

    /// Re-encodes audio or video; the container follows `out`'s extension.
    async fn transcode(&self, input: &Path, out: &Path) -> ToolResult<()>;

    /// Extracts the audio track of a video as MP3.
    async fn extract_audio(&self, video: &Path, out: &Path) -> ToolResult<()>;

    /// Takes a PNG screenshot of a web page (or `file://` URL).
    async fn screenshot(&self, url: &str, out: &Path) -> ToolResult<()>;

    /// Prints a web page to PDF.
    async fn page_pdf(&self, url: &str, out: &Path) -> ToolResult<()>;
}
