//! Audio and video conversion.

use oladizz_core::{ActionTag, FieldUpdate, FileKind, OutboundFile, Reply, fields};
use oladizz_framework::{ActionContext, BackgroundTask, HandlerError, HandlerResult, Step};

use super::{download, extension, file, send, stem, text, working, workspace};
use crate::media::MediaToolkit;

pub const AUDIO_FORMATS: &[&str] = &["mp3", "wav", "ogg", "flac", "aac", "m4a"];
pub const VIDEO_FORMATS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// Which kind of media a conversion works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Media {
    Audio,
    Video,
}

impl Media {
    fn noun(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    fn formats(self) -> &'static [&'static str] {
        match self {
            Self::Audio => AUDIO_FORMATS,
            Self::Video => VIDEO_FORMATS,
        }
    }

    fn next(self) -> ActionTag {
        match self {
            Self::Audio => ActionTag::AwaitingTargetAudioFormat,
            Self::Video => ActionTag::AwaitingTargetVideoFormat,
        }
    }

    fn fallback_name(self) -> &'static str {
        match self {
            Self::Audio => "audio.ogg",
            Self::Video => "video.mp4",
        }
    }
}

/// Remembers the received file and asks for the target format.
async fn received(ctx: ActionContext, media: Media) -> HandlerResult {
    let source = file(&ctx)?;
    let name = source.name_or(media.fallback_name()).to_string();
    let examples = media.formats()[..3]
        .iter()
        .map(|f| format!("`{f}`"))
        .collect::<Vec<_>>()
        .join(", ");

    let noun = media.noun();
    let mut heading = noun.to_string();
    heading[..1].make_ascii_uppercase();
    Ok(Step::advance(
        media.next(),
        vec![
            FieldUpdate::set(fields::FILE_ID, source.file_id),
            FieldUpdate::set(fields::FILE_NAME, name),
        ],
    )
    .reply(Reply::markdown(format!(
        "{heading} file received. Now, please send me the target format (e.g., {examples})."
    ))))
}

pub async fn audio_received(ctx: ActionContext) -> HandlerResult {
    received(ctx, Media::Audio).await
}

pub async fn video_received(ctx: ActionContext) -> HandlerResult {
    received(ctx, Media::Video).await
}

/// Transcodes the stored file into the typed format.
async fn convert(ctx: ActionContext, media: Media) -> HandlerResult {
    let target = text(&ctx).trim_start_matches('.').to_ascii_lowercase();
    if !media.formats().contains(&target.as_str()) {
        return Err(HandlerError::validation(format!(
            "Unsupported format '{target}'. Please choose one of: {}.",
            media.formats().join(", ")
        )));
    }
    let Some(file_id) = ctx.scratch().str(fields::FILE_ID).map(str::to_string) else {
        return Err(HandlerError::validation(format!(
            "I lost track of your {} file. Send /start and try again.",
            media.noun()
        )));
    };
    let name = ctx
        .scratch()
        .str(fields::FILE_NAME)
        .unwrap_or(media.fallback_name())
        .to_string();
    let toolkit = ctx.require::<dyn MediaToolkit>()?;
    let noun = media.noun();
    let label = target.to_uppercase();
    let progress = format!("Converting your {noun} to {label}... This may take a moment.");

    let task = BackgroundTask::new(
        "convert_media",
        format!("Sorry, there was an error converting your {noun} file."),
        async move {
            let source_ext = extension(&name).unwrap_or_else(|| "bin".to_string());
            let input = download(&ctx, &file_id, noun, &source_ext).await?;
            let dir = workspace(&ctx, noun).await?;
            let out = dir.join(format!("{}.{target}", stem(&name)));
            toolkit.transcode(input.path(), &out).await?;
            let kind = match media {
                Media::Audio => FileKind::Audio,
                Media::Video => FileKind::Document,
            };
            send(&ctx, OutboundFile::new(kind, &out)).await?;
            Ok(Some(Reply::text(format!(
                "Your {noun} was converted to {label} successfully! Send /start to convert more."
            ))))
        },
    );
    Ok(working(&progress, task))
}

pub async fn audio_target(ctx: ActionContext) -> HandlerResult {
    convert(ctx, Media::Audio).await
}

pub async fn video_target(ctx: ActionContext) -> HandlerResult {
    convert(ctx, Media::Video).await
}

pub async fn extract_audio(ctx: ActionContext) -> HandlerResult {
    let toolkit = ctx.require::<dyn MediaToolkit>()?;
    let video = file(&ctx)?;

    let task = BackgroundTask::new(
        "extract_audio",
        "Sorry, there was an error extracting audio from your video.",
        async move {
            let input = download(&ctx, &video.file_id, "video", "mp4").await?;
            let dir = workspace(&ctx, "audio").await?;
            let name = format!("{}.mp3", stem(video.name_or("extracted_audio.mp4")));
            let out = dir.join(name);
            toolkit.extract_audio(input.path(), &out).await?;
            send(&ctx, OutboundFile::new(FileKind::Audio, &out)).await?;
            Ok(Some(Reply::text(
                "Audio extracted successfully! Send /start to convert more.",
            )))
        },
    );
    Ok(working(
        "Extracting audio from video... This may take a moment.",
        task,
    ))
}
