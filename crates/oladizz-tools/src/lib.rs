//! # Oladizz Tools
//!
//! The feature layer of the Oladizz bot: the menu tree, one handler per
//! pending action, and the clients and media toolkit those handlers call.
//!
//! ```rust,ignore
//! let services = oladizz_tools::services(&ToolSettings::default())?;
//! let engine = ConversationEngine::builder(store, outbound)
//!     .registry(oladizz_tools::registry())
//!     .menu(oladizz_tools::menu())
//!     .services(services)
//!     .build()?;
//! ```

pub mod clients;
pub mod error;
pub mod handlers;
pub mod media;
pub mod menu;
pub mod settings;

use std::sync::Arc;

use oladizz_core::ActionTag::*;
use oladizz_core::EventKind::{Audio, Callback, Document, Photo, Text, Video};
use oladizz_framework::{ActionRegistry, Services};

use crate::clients::{
    GeminiClient, GitHubClient, Http, KeyTester, NpmClient, PageFetcher, Shortener,
};
use crate::handlers::{ai, data, deep_search, github, images, keys, media as av, pdf, utilities, web};
use crate::media::{BoxedToolkit, ExternalToolkit, MediaToolkit};

pub use error::{ToolError, ToolResult};
pub use menu::menu;
pub use settings::{Binaries, Endpoints, ToolSettings};

/// Routes every pending action to its handler.
pub fn registry() -> ActionRegistry {
    ActionRegistry::new()
        // PDF
        .on(AwaitingTextForPdf, &[Text], pdf::text_to_pdf)
        .on(AwaitingImageForPdf, &[Photo], pdf::image_to_pdf)
        .on(AwaitingImagesForPdf, &[Photo], pdf::collect_image)
        .on(AwaitingImagesForPdf, &[Text], pdf::finish_images)
        // Images
        .on(AwaitingFrameCount, &[Text], images::frame_count)
        .on(AwaitingVideoForImages, &[Video], images::video_to_images)
        .on(AwaitingImageForSticker, &[Photo], images::sticker)
        .on(AwaitingImageForConversion, &[Photo], images::convert_image)
        .on(AwaitingImageForOcr, &[Photo], images::ocr)
        .on(AwaitingJsonForImage, &[Text], images::json_to_image)
        // Media
        .on(AwaitingAudioForConversion, &[Audio], av::audio_received)
        .on(AwaitingTargetAudioFormat, &[Text], av::audio_target)
        .on(AwaitingVideoForConversion, &[Video], av::video_received)
        .on(AwaitingTargetVideoFormat, &[Text], av::video_target)
        .on(AwaitingVideoForAudioExtraction, &[Video], av::extract_audio)
        // Developer tools
        .on(AwaitingTextForBase64Encode, &[Text], utilities::base64_encode)
        .on(AwaitingTextForBase64Decode, &[Text], utilities::base64_decode)
        .on(AwaitingNpmSearchQuery, &[Text], utilities::npm_search)
        .on(AwaitingJsonForFormatting, &[Text], utilities::format_json)
        .on(AwaitingYamlForFormatting, &[Text], utilities::format_yaml)
        // Data
        .on(AwaitingJsonForCsv, &[Document], data::json_file_to_csv)
        .on(AwaitingCsvForJson, &[Document], data::csv_file_to_json)
        .on(AwaitingTextForCsv, &[Text], data::text_to_csv)
        // Web
        .on(AwaitingUrlForScreenshot, &[Text], web::screenshot)
        .on(AwaitingUrlForPdf, &[Text], web::page_pdf)
        .on(AwaitingUrlForMetadata, &[Text], web::metadata)
        .on(AwaitingUrlForLinks, &[Text], web::links)
        .on(AwaitingUrlForSource, &[Text], web::source)
        .on(AwaitingUrlForDownload, &[Text], web::download)
        // Other utilities
        .on(AwaitingTextForQr, &[Text], utilities::qr_code)
        .on(AwaitingUrlForShortening, &[Text], utilities::shorten)
        .on(AwaitingPasswordOptions, &[Text], utilities::password)
        // Credentials
        .on(AwaitingApiKeyToAdd, &[Text], keys::add)
        .on(AwaitingApiKeyToDelete, &[Text], keys::delete)
        // AI chat
        .on(AwaitingGeminiKeyForChat, &[Text], ai::save_key)
        .on(AiChatActive, &[Text], ai::chat_turn)
        // GitHub
        .on(AwaitingToken, &[Text], github::set_token)
        .on(AwaitingRepoForInfo, &[Text], github::repo_info)
        .on(AwaitingRepoForCreation, &[Text], github::create_repo)
        .on(AwaitingFileForUpload, &[Document], github::upload_received)
        .on(AwaitingUploadDetails, &[Text], github::upload_details)
        .on(AwaitingRepoForBranches, &[Text], github::branches)
        .on(AwaitingRepoBranchForCommits, &[Text], github::commits)
        .on(AwaitingIssueDetails, &[Text], github::create_issue)
        .on(AwaitingSearchQuery, &[Text], github::search_repos)
        .on(AwaitingUserSearchQuery, &[Text], github::search_users)
        .on(AwaitingUsernameForGists, &[Text], github::gists)
        .on(AwaitingCommitDetails, &[Text], github::get_commit)
        // Deep search
        .on(AwaitingDeepSearchQuery, &[Text], deep_search::query)
        .on(AwaitingDeepSearchLanguage, &[Text], deep_search::language)
        .on(AwaitingDeepSearchStars, &[Text], deep_search::stars)
        .on(AwaitingDeepSearchSort, &[Text, Callback], deep_search::sort)
}

/// Builds the shared services with the external-program toolkit.
pub fn services(settings: &ToolSettings) -> ToolResult<Services> {
    let toolkit: BoxedToolkit = Arc::new(ExternalToolkit::new(settings.binaries.clone()));
    services_with(settings, toolkit)
}

/// Builds the shared services around the given toolkit.
pub fn services_with(settings: &ToolSettings, toolkit: BoxedToolkit) -> ToolResult<Services> {
    let http = Http::new(settings)?;
    let endpoints = &settings.endpoints;
    Ok(Services::new()
        .with::<dyn MediaToolkit>(toolkit)
        .with(Arc::new(GitHubClient::new(http.clone(), &endpoints.github_api)))
        .with(Arc::new(GeminiClient::new(
            http.clone(),
            &endpoints.gemini_api,
            &endpoints.gemini_model,
        )))
        .with(Arc::new(NpmClient::new(http.clone(), &endpoints.npm_registry)))
        .with(Arc::new(Shortener::new(http.clone(), &endpoints.tinyurl_api)))
        .with(Arc::new(KeyTester::new(http.clone())))
        .with(Arc::new(PageFetcher::new(http)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oladizz_core::ActionTag;

    #[test]
    fn test_registry_covers_every_action() {
        let registry = registry();
        registry.validate().unwrap();
        assert_eq!(
            registry.kinds_for(ActionTag::AwaitingImagesForPdf).len(),
            2
        );
        assert!(registry.lookup(ActionTag::AwaitingDeepSearchSort, Callback).is_some());
        assert!(registry.lookup(ActionTag::AwaitingTextForPdf, Photo).is_none());
    }

    #[test]
    fn test_services_are_registered() {
        let services = services(&ToolSettings::default()).unwrap();
        assert!(services.get::<dyn MediaToolkit>().is_some());
        assert!(services.get::<GitHubClient>().is_some());
        assert!(services.get::<PageFetcher>().is_some());
        assert_eq!(services.len(), 7);
    }
}
