//! Feature handlers, one module per menu category.
//!
//! Quick operations answer inside the handler. Anything that downloads,
//! renders or waits on a remote service returns a [`Step`] that clears the
//! action, sends a progress line and spawns a
//! [`BackgroundTask`](oladizz_framework::BackgroundTask) doing the work.

pub mod ai;
pub mod data;
pub mod deep_search;
pub mod github;
pub mod images;
pub mod keys;
pub mod media;
pub mod pdf;
pub mod utilities;
pub mod web;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;

use oladizz_core::{FileRef, OutboundFile, TempArtifact};
use oladizz_framework::{ActionContext, HandlerError, HandlerResult, Step};

use crate::error::ToolResult;

/// Trimmed text of the event; handlers are only registered for text.
pub(crate) fn text(ctx: &ActionContext) -> &str {
    ctx.text().unwrap_or_default()
}

/// The file carried by the event.
pub(crate) fn file(ctx: &ActionContext) -> HandlerResult<FileRef> {
    ctx.event()
        .file_ref()
        .cloned()
        .ok_or_else(|| HandlerError::validation("Please send a file."))
}

/// Downloads a received file into a fresh temporary file.
pub(crate) async fn download(
    ctx: &ActionContext,
    file_id: &str,
    prefix: &str,
    ext: &str,
) -> HandlerResult<TempArtifact> {
    let bytes = ctx.outbound().download_file(file_id).await?;
    let artifact = TempArtifact::file(ctx.temp_dir(), prefix, ext);
    write(artifact.path(), &bytes).await?;
    Ok(artifact)
}

pub(crate) async fn write(path: &Path, bytes: &[u8]) -> ToolResult<()> {
    Ok(tokio::fs::write(path, bytes).await?)
}

/// A temporary directory for outputs that must keep a chosen file name.
pub(crate) async fn workspace(ctx: &ActionContext, prefix: &str) -> ToolResult<TempArtifact> {
    Ok(TempArtifact::dir(ctx.temp_dir(), prefix).await?)
}

/// Uploads a file to the chat.
pub(crate) async fn send(ctx: &ActionContext, file: OutboundFile) -> HandlerResult<()> {
    ctx.outbound().send_file(ctx.chat(), &file).await?;
    Ok(())
}

/// The step that clears the action, then starts `task` after `progress`.
pub(crate) fn working(progress: &str, task: oladizz_framework::BackgroundTask) -> Step {
    Step::clear().reply(progress).spawn(task)
}

/// Extension of a file name, lowercased.
pub(crate) fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

/// File name without its extension.
pub(crate) fn stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_parts() {
        assert_eq!(extension("Data.JSON").as_deref(), Some("json"));
        assert_eq!(extension("README"), None);
        assert_eq!(stem("report.final.csv"), "report.final");
    }
}
