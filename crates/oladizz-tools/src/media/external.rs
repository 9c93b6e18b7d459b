//! [`MediaToolkit`] backed by external programs.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::MediaToolkit;
use super::process::run;
use crate::error::{ToolError, ToolResult};
use crate::settings::Binaries;

/// Browser viewport for screenshots.
const WINDOW_SIZE: &str = "--window-size=1280,800";

/// Runs ffmpeg, ImageMagick, tesseract, qrencode, zip and a headless
/// Chromium.
#[derive(Debug, Clone)]
pub struct ExternalToolkit {
    bin: Binaries,
}

impl ExternalToolkit {
    pub fn new(bin: Binaries) -> Self {
        Self { bin }
    }

    async fn ffmpeg(&self, args: Vec<OsString>) -> ToolResult<()> {
        let mut full: Vec<OsString> = vec!["-y".into(), "-loglevel".into(), "error".into()];
        full.extend(args);
        run(&self.bin.ffmpeg, full, None).await.map(drop)
    }

    async fn chromium(&self, mode: OsString, url: &str) -> ToolResult<()> {
        let args: Vec<OsString> = vec![
            "--headless".into(),
            "--disable-gpu".into(),
            "--no-sandbox".into(),
            "--hide-scrollbars".into(),
            WINDOW_SIZE.into(),
            mode,
            url.into(),
        ];
        run(&self.bin.chromium, args, None).await.map(drop)
    }

    /// Video length in seconds.
    async fn duration(&self, video: &Path) -> ToolResult<f64> {
        let out = run(
            &self.bin.ffprobe,
            [
                OsString::from("-v"),
                "error".into(),
                "-show_entries".into(),
                "format=duration".into(),
                "-of".into(),
                "default=noprint_wrappers=1:nokey=1".into(),
                video.into(),
            ],
            None,
        )
        .await?;
        let text = String::from_utf8_lossy(&out);
        text.trim()
            .parse::<f64>()
            .map_err(|_| ToolError::decode(format!("unexpected duration '{}'", text.trim())))
    }
}

/// Timestamps splitting `duration` into `count + 1` equal parts.
pub fn frame_timestamps(duration: f64, count: u32) -> Vec<f64> {
    let step = duration / f64::from(count + 1);
    (1..=count).map(|i| step * f64::from(i)).collect()
}

/// Files directly inside `dir`, sorted by name.
async fn list_files(dir: &Path) -> ToolResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[async_trait]
impl MediaToolkit for ExternalToolkit {
    async fn text_to_pdf(&self, text: &str, out: &Path) -> ToolResult<()> {
        let source = out.with_extension("txt");
        tokio::fs::write(&source, text).await?;
        let mut spec = OsString::from("text:");
        spec.push(&source);
        let result = run(&self.bin.magick, [spec, out.into()], None).await;
        let _ = tokio::fs::remove_file(&source).await;
        result.map(drop)
    }

    async fn images_to_pdf(&self, images: &[PathBuf], out: &Path) -> ToolResult<()> {
        if images.is_empty() {
            return Err(ToolError::Unsupported("no images to bind".into()));
        }
        let mut args: Vec<OsString> = images.iter().map(OsString::from).collect();
        args.push(out.into());
        run(&self.bin.magick, args, None).await.map(drop)
    }

    async fn ocr(&self, image: &Path) -> ToolResult<String> {
        let out = run(
            &self.bin.tesseract,
            [image.into(), OsString::from("stdout"), "-l".into(), "eng".into()],
            None,
        )
        .await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    async fn qr_code(&self, text: &str, out: &Path) -> ToolResult<()> {
        run(
            &self.bin.qrencode,
            [OsString::from("-o"), out.into(), "-t".into(), "PNG".into(), "-s".into(), "8".into()],
            Some(text.as_bytes()),
        )
        .await
        .map(drop)
    }

    async fn extract_frames(&self, video: &Path, count: u32, dir: &Path) -> ToolResult<usize> {
        let duration = self.duration(video).await?;
        debug!(duration, count, "Extracting frames");
        for (i, at) in frame_timestamps(duration, count).into_iter().enumerate() {
            let frame = dir.join(format!("frame-{:03}.png", i + 1));
            self.ffmpeg(vec![
                "-ss".into(),
                format!("{at:.3}").into(),
                "-i".into(),
                video.into(),
                "-frames:v".into(),
                "1".into(),
                frame.into(),
            ])
            .await?;
        }
        Ok(list_files(dir).await?.len())
    }

    async fn zip_dir(&self, dir: &Path, out: &Path) -> ToolResult<()> {
        let files = list_files(dir).await?;
        if files.is_empty() {
            return Err(ToolError::Unsupported("nothing to archive".into()));
        }
        let mut args: Vec<OsString> = vec!["-q".into(), "-j".into(), out.into()];
        args.extend(files.into_iter().map(OsString::from));
        run(&self.bin.zip, args, None).await.map(drop)
    }

    async fn transcode(&self, input: &Path, out: &Path) -> ToolResult<()> {
        self.ffmpeg(vec!["-i".into(), input.into(), out.into()]).await
    }

    async fn extract_audio(&self, video: &Path, out: &Path) -> ToolResult<()> {
        self.ffmpeg(vec![
            "-i".into(),
            video.into(),
            "-vn".into(),
            "-acodec".into(),
            "libmp3lame".into(),
            out.into(),
        ])
        .await
    }

    async fn screenshot(&self, url: &str, out: &Path) -> ToolResult<()> {
        let mut mode = OsString::from("--screenshot=");
        mode.push(out);
        self.chromium(mode, url).await
    }

    async fn page_pdf(&self, url: &str, out: &Path) -> ToolResult<()> {
        let mut mode = OsString::from("--print-to-pdf=");
        mode.push(out);
        self.chromium(mode, url).await
    }
}
