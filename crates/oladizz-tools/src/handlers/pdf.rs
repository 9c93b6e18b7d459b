//! PDF tools.

use oladizz_core::{FieldUpdate, OutboundFile, Reply, fields};
use oladizz_framework::{ActionContext, BackgroundTask, HandlerError, HandlerResult, Step};
use serde_json::Value;

use super::{download, file, send, text, workspace};
use crate::media::MediaToolkit;

const DONE: &str = "done";

/// Text to PDF.
pub async fn text_to_pdf(ctx: ActionContext) -> HandlerResult {
    let toolkit = ctx.require::<dyn MediaToolkit>()?;
    let body = text(&ctx).to_string();

    let task = BackgroundTask::new("text_to_pdf", "There was an error sending your PDF.", async move {
        let dir = workspace(&ctx, "pdf").await?;
        let out = dir.join("text.pdf");
        toolkit.text_to_pdf(&body, &out).await?;
        send(&ctx, OutboundFile::document(&out)).await?;
        Ok(Some(Reply::text(
            "Text converted to PDF successfully! Send /start to convert more.",
        )))
    });
    Ok(Step::clear().spawn(task))
}

/// One photo to PDF.
pub async fn image_to_pdf(ctx: ActionContext) -> HandlerResult {
    let toolkit = ctx.require::<dyn MediaToolkit>()?;
    let photo = file(&ctx)?;

    let task = BackgroundTask::new(
        "image_to_pdf",
        "I'm sorry, I had trouble processing that image for PDF conversion.",
        async move {
            let image = download(&ctx, &photo.file_id, "image", "jpg").await?;
            let dir = workspace(&ctx, "pdf").await?;
            let out = dir.join("image.pdf");
            toolkit.images_to_pdf(&[image.path().to_path_buf()], &out).await?;
            send(&ctx, OutboundFile::document(&out)).await?;
            Ok(Some(Reply::text(
                "Image converted to PDF successfully! Send /start to convert more.",
            )))
        },
    );
    Ok(Step::clear().reply("Processing image for PDF...").spawn(task))
}

/// Adds a photo to the batch being combined.
///
/// The count in the reply is read from the committed record, so photos
/// arriving together are all counted.
pub async fn collect_image(ctx: ActionContext) -> HandlerResult {
    let photo = file(&ctx)?;
    Ok(Step::accumulate(vec![FieldUpdate::append(
        fields::IMAGES,
        vec![Value::String(photo.file_id)],
    )])
    .reply_with(|doc| {
        let total = doc
            .and_then(|d| d.get(fields::IMAGES))
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        Reply::text(format!(
            "Image received ({total} total). Send more images or 'done' to finish."
        ))
    }))
}

/// `done` binds the collected photos into one PDF, in the order received.
pub async fn finish_images(ctx: ActionContext) -> HandlerResult {
    if !text(&ctx).eq_ignore_ascii_case(DONE) {
        return Err(HandlerError::validation(
            "Please send another image, or 'done' when you are finished.",
        ));
    }
    let images = ctx.scratch().strings(fields::IMAGES);
    if images.is_empty() {
        return Err(HandlerError::validation(
            "You haven't sent any images yet. Please send some images first.",
        ));
    }
    let toolkit = ctx.require::<dyn MediaToolkit>()?;
    let progress = format!("Combining {} images into a PDF...", images.len());

    let task = BackgroundTask::new(
        "combine_images",
        "I'm sorry, I had trouble combining your images into a PDF.",
        async move {
            let mut pages = Vec::with_capacity(images.len());
            for (i, id) in images.iter().enumerate() {
                pages.push(download(&ctx, id, &format!("page{:03}", i + 1), "jpg").await?);
            }
            let paths: Vec<_> = pages.iter().map(|p| p.path().to_path_buf()).collect();
            let dir = workspace(&ctx, "pdf").await?;
            let out = dir.join("combined.pdf");
            toolkit.images_to_pdf(&paths, &out).await?;
            send(&ctx, OutboundFile::document(&out)).await?;
            Ok(Some(Reply::text(
                "Images combined into PDF successfully! Send /start to convert more.",
            )))
        },
    );
    Ok(Step::clear().reply(progress).spawn(task))
}
