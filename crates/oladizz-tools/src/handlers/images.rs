//! Image tools: frames from video, stickers, format conversion, OCR and
//! JSON rendering.

use oladizz_core::{ActionTag, FieldUpdate, FileKind, OutboundFile, Reply, fields};
use oladizz_framework::{ActionContext, BackgroundTask, HandlerError, HandlerResult, Step};
use regex::{Captures, Regex};
use serde_json::Value;
use url::Url;

use super::{download, file, send, text, working, workspace, write};
use crate::error::{ToolError, ToolResult};
use crate::media::{MediaToolkit, TargetFormat, imaging};

/// Frames extracted when no count was stored.
pub const DEFAULT_FRAME_COUNT: u32 = 10;

/// Upper bound on the frame count a user may ask for.
pub const MAX_FRAME_COUNT: u32 = 100;

/// Runs CPU-bound image work off the async workers.
async fn blocking<T, F>(work: F) -> ToolResult<T>
where
    F: FnOnce() -> ToolResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ToolError::Unsupported(format!("image worker stopped: {e}")))?
}

// =============================================================================
// Video to images
// =============================================================================

pub async fn frame_count(ctx: ActionContext) -> HandlerResult {
    let count = match text(&ctx).parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => {
            return Err(HandlerError::validation(
                "Please provide a valid number greater than 0.",
            ));
        }
    };
    if count > MAX_FRAME_COUNT {
        return Err(HandlerError::validation(format!(
            "Please choose at most {MAX_FRAME_COUNT} frames."
        )));
    }
    Ok(Step::advance(
        ActionTag::AwaitingVideoForImages,
        vec![FieldUpdate::set(fields::FRAME_COUNT, count)],
    )
    .reply(format!(
        "Okay, I will extract {count} frames. Please send me the video."
    )))
}

pub async fn video_to_images(ctx: ActionContext) -> HandlerResult {
    let toolkit = ctx.require::<dyn MediaToolkit>()?;
    let video = file(&ctx)?;
    let count = ctx
        .scratch()
        .u64(fields::FRAME_COUNT)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_FRAME_COUNT);

    let task = BackgroundTask::new(
        "video_to_images",
        "Sorry, there was an error processing your video.",
        async move {
            let input = download(&ctx, &video.file_id, "video", "mp4").await?;
            let frames = workspace(&ctx, "frames").await?;
            let extracted = toolkit.extract_frames(input.path(), count, frames.path()).await?;
            tracing::debug!(chat = %ctx.chat(), extracted, "frames extracted");

            ctx.outbound()
                .send_text(
                    ctx.chat(),
                    &Reply::text("Processing complete. Compressing frames into a ZIP file..."),
                )
                .await?;
            let archive = workspace(&ctx, "zip").await?;
            let out = archive.join("frames.zip");
            toolkit.zip_dir(frames.path(), &out).await?;
            send(&ctx, OutboundFile::document(&out)).await?;
            Ok(Some(Reply::text(
                "Video conversion complete! Send /start to convert more.",
            )))
        },
    );
    Ok(working(
        "Downloading and processing video... This may take a moment.",
        task,
    ))
}

// =============================================================================
// Sticker / format conversion
// =============================================================================

pub async fn sticker(ctx: ActionContext) -> HandlerResult {
    let photo = file(&ctx)?;

    let task = BackgroundTask::new(
        "sticker",
        "Sorry, I had trouble converting your image to a sticker.",
        async move {
            let bytes = ctx.outbound().download_file(&photo.file_id).await?;
            let webp = blocking(move || imaging::sticker(&bytes)).await?;
            let dir = workspace(&ctx, "sticker").await?;
            let out = dir.join("sticker.webp");
            write(&out, &webp).await?;
            send(&ctx, OutboundFile::new(FileKind::Sticker, &out)).await?;
            Ok(Some(Reply::text(
                "Image converted to sticker successfully! Send /start to convert more.",
            )))
        },
    );
    Ok(working("Converting image to sticker...", task))
}

/// Converts a photo to the format chosen from the menu.
pub async fn convert_image(ctx: ActionContext) -> HandlerResult {
    let photo = file(&ctx)?;
    let requested = ctx.scratch().str(fields::FORMAT).unwrap_or_default();
    let Ok(format) = requested.parse::<TargetFormat>() else {
        return Ok(Step::clear().reply(format!(
            "Sorry, I can't convert images to '{requested}'. Please choose a format from the menu."
        )));
    };
    let label = format.label();

    let task = BackgroundTask::new(
        "convert_image",
        format!("Sorry, I had trouble converting your image to {label}."),
        async move {
            let bytes = ctx.outbound().download_file(&photo.file_id).await?;
            let converted = blocking(move || imaging::convert(&bytes, format)).await?;
            let dir = workspace(&ctx, "convert").await?;
            let out = dir.join(format!("converted.{}", format.as_str()));
            write(&out, &converted).await?;
            send(
                &ctx,
                OutboundFile::document(&out)
                    .with_caption(format!("Image converted to {}!", format.label())),
            )
            .await?;
            Ok(Some(Reply::text(
                "Image conversion complete! Send /start to convert more.",
            )))
        },
    );
    Ok(working(&format!("Converting image to {}...", format.label()), task))
}

// =============================================================================
// OCR
// =============================================================================

pub async fn ocr(ctx: ActionContext) -> HandlerResult {
    let toolkit = ctx.require::<dyn MediaToolkit>()?;
    let photo = file(&ctx)?;

    let task = BackgroundTask::new(
        "ocr",
        "Sorry, I encountered an error while processing the image for OCR.",
        async move {
            let image = download(&ctx, &photo.file_id, "ocr", "jpg").await?;
            let extracted = toolkit.ocr(image.path()).await?;
            let extracted = extracted.trim();
            if extracted.is_empty() {
                return Ok(Some(Reply::text(
                    "No text found in the image or text is illegible.",
                )));
            }
            Ok(Some(Reply::markdown(format!(
                "*Extracted Text:*\n```\n{extracted}\n```"
            ))))
        },
    );
    Ok(working(
        "Processing image for OCR... This might take a moment.",
        task,
    ))
}

// =============================================================================
// JSON to image
// =============================================================================

const JSON_TOKEN: &str =
    r#"("(\\u[a-zA-Z0-9]{4}|\\[^u]|[^\\"])*"(\s*:)?|\b(true|false|null)\b|-?\d+(?:\.\d*)?(?:[eE][+\-]?\d+)?)"#;

/// Pretty-prints `value` as a dark-themed, syntax-highlighted HTML page.
pub fn json_to_html(value: &Value) -> ToolResult<String> {
    let pretty = serde_json::to_string_pretty(value)?;
    let escaped = pretty
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    let token = Regex::new(JSON_TOKEN).map_err(ToolError::decode)?;
    let highlighted = token.replace_all(&escaped, |caps: &Captures<'_>| {
        let matched = &caps[0];
        let class = if matched.starts_with('"') {
            if matched.ends_with(':') { "key" } else { "string" }
        } else if matched == "true" || matched == "false" {
            "boolean"
        } else if matched == "null" {
            "null"
        } else {
            "number"
        };
        format!(r#"<span class="{class}">{matched}</span>"#)
    });

    Ok(format!(
        r#"<html>
<head>
<style>
body {{ background-color: #1E1E1E; font-family: monospace; font-size: 16px; padding: 20px; display: inline-block; }}
pre {{ color: #D4D4D4; white-space: pre-wrap; word-wrap: break-word; }}
.string {{ color: #CE9178; }}
.number {{ color: #B5CEA8; }}
.boolean {{ color: #569CD6; }}
.null {{ color: #569CD6; }}
.key {{ color: #9CDCFE; }}
</style>
</head>
<body><pre>{highlighted}</pre></body>
</html>
"#
    ))
}

pub async fn json_to_image(ctx: ActionContext) -> HandlerResult {
    let value: Value = serde_json::from_str(text(&ctx))
        .map_err(|e| HandlerError::validation(format!("Invalid JSON: {e}")))?;
    let toolkit = ctx.require::<dyn MediaToolkit>()?;

    let task = BackgroundTask::new(
        "json_to_image",
        "Sorry, I couldn't generate an image from that JSON.",
        async move {
            let dir = workspace(&ctx, "json").await?;
            let page = dir.join("json.html");
            write(&page, json_to_html(&value)?.as_bytes()).await?;
            let url = Url::from_file_path(&page)
                .map_err(|_| ToolError::decode(format!("not an absolute path: {}", page.display())))?;
            let out = dir.join("json.png");
            toolkit.screenshot(url.as_str(), &out).await?;
            send(&ctx, OutboundFile::photo(&out)).await?;
            Ok(Some(Reply::text("JSON converted to image successfully!")))
        },
    );
    Ok(working(
        "Generating image from JSON... This might take a moment.",
        task,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Harness;
    use oladizz_core::{EventKind, FileRef};
    use oladizz_framework::testing::RecordingOutbound;
    use serde_json::json;

    #[test]
    fn test_json_to_html_classes() {
        let html = json_to_html(&json!({ "name": "<b>", "n": -1.5, "ok": true, "none": null })).unwrap();
        assert!(html.contains(r#"<span class="key">"name":</span>"#));
        assert!(html.contains(r#"<span class="string">"&lt;b&gt;"</span>"#));
        assert!(html.contains(r#"<span class="number">-1.5</span>"#));
        assert!(html.contains(r#"<span class="boolean">true</span>"#));
        assert!(html.contains(r#"<span class="null">null</span>"#));
    }

    #[tokio::test]
    async fn test_frame_count_then_video() {
        let outbound = RecordingOutbound::new().with_download("vid", b"movie".to_vec());
        let h = Harness::with_outbound(outbound).await;

        h.press(1, "convert_video_to_images").await;
        h.text(1, "zero").await;
        assert_eq!(h.last_text(), "Please provide a valid number greater than 0.");
        h.text(1, "0").await;
        assert_eq!(h.action(1).await.as_deref(), Some("awaiting_frame_count"));

        h.text(1, "3").await;
        assert_eq!(
            h.doc(1).await,
            Some(json!({ "action": "awaiting_video_for_images", "frameCount": 3 }))
        );
        assert_eq!(
            h.last_text(),
            "Okay, I will extract 3 frames. Please send me the video."
        );

        h.file(1, EventKind::Video, FileRef::new("vid")).await;
        assert_eq!(h.doc(1).await, None);
        assert_eq!(h.toolkit.calls(), vec!["extract_frames movie 3", "zip_dir 3"]);
        assert_eq!(
            h.uploads(),
            vec![(
                "frames.zip".to_string(),
                None,
                "zip:frame-001.png,frame-002.png,frame-003.png".to_string()
            )]
        );
        let texts = h.texts();
        assert!(texts.contains(&"Processing complete. Compressing frames into a ZIP file...".to_string()));
        assert_eq!(
            h.last_text(),
            "Video conversion complete! Send /start to convert more."
        );
    }

    #[tokio::test]
    async fn test_video_without_count_uses_default() {
        let outbound = RecordingOutbound::new().with_download("vid", b"movie".to_vec());
        let h = Harness::with_outbound(outbound).await;
        h.seed(1, json!({ "action": "awaiting_video_for_images" })).await;
        h.file(1, EventKind::Video, FileRef::new("vid")).await;
        assert_eq!(h.toolkit.calls()[0], "extract_frames movie 10");
    }

    #[tokio::test]
    async fn test_photo_while_waiting_for_count_gets_hint() {
        let h = Harness::new().await;
        h.press(1, "convert_video_to_images").await;
        h.photo(1, "p").await;
        assert_eq!(h.action(1).await.as_deref(), Some("awaiting_frame_count"));
        assert_eq!(
            h.last_text(),
            "I'm waiting for a text message. Send /cancel to stop the current operation."
        );
    }

    #[tokio::test]
    async fn test_ocr_replies_with_text() {
        let outbound = RecordingOutbound::new()
            .with_download("img", b"text:Hello\n".to_vec())
            .with_download("blank", b"text:  ".to_vec());
        let h = Harness::with_outbound(outbound).await;

        h.press(1, "ocr_image").await;
        h.photo(1, "img").await;
        let reply = h.outbound.last_reply().unwrap();
        assert_eq!(reply.text, "*Extracted Text:*\n```\nHello\n```");

        h.press(1, "ocr_image").await;
        h.photo(1, "blank").await;
        assert_eq!(h.last_text(), "No text found in the image or text is illegible.");
    }

    #[tokio::test]
    async fn test_invalid_json_keeps_waiting() {
        let h = Harness::new().await;
        h.press(1, "json_to_image").await;
        h.text(1, "{ nope").await;
        assert!(h.last_text().starts_with("Invalid JSON: "));
        assert_eq!(h.action(1).await.as_deref(), Some("awaiting_json_for_image"));

        h.text(1, r#"{"a": 1}"#).await;
        assert_eq!(h.doc(1).await, None);
        assert_eq!(h.toolkit.calls(), vec!["screenshot file"]);
        assert_eq!(h.last_text(), "JSON converted to image successfully!");
    }

    #[tokio::test]
    async fn test_unknown_target_format_is_rejected() {
        let h = Harness::new().await;
        h.press(1, "format_tiff").await;
        assert_eq!(h.action(1).await.as_deref(), Some("awaiting_image_for_conversion"));
        h.photo(1, "img").await;
        assert_eq!(h.doc(1).await, None);
        assert_eq!(
            h.last_text(),
            "Sorry, I can't convert images to 'tiff'. Please choose a format from the menu."
        );
        assert!(h.toolkit.calls().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_image_reports_format_failure() {
        let outbound = RecordingOutbound::new().with_download("img", b"not an image".to_vec());
        let h = Harness::with_outbound(outbound).await;
        h.press(1, "format_png").await;
        h.photo(1, "img").await;
        assert_eq!(h.doc(1).await, None);
        assert_eq!(
            h.texts()[1..],
            [
                "Converting image to PNG...".to_string(),
                "Sorry, I had trouble converting your image to PNG.".to_string(),
            ]
        );
    }
}
