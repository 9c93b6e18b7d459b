//! The closed set of conversational steps.
//!
//! Every value a chat's `action` field may hold is an [`ActionTag`]. The
//! string forms are the persisted representation and must stay stable.
//! Anything else found in storage is stale and gets cleared by the engine.

use std::fmt;
use std::str::FromStr;

/// Error returned when a string does not name a known action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action tag '{0}'")]
pub struct UnknownAction(pub String);

/// Generates the [`ActionTag`] enum together with its string table.
macro_rules! action_tags {
    (
        $( $(#[$meta:meta])* $variant:ident => $name:literal ),* $(,)?
    ) => {
        /// Which step a chat is currently waiting on.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ActionTag {
            $( $(#[$meta])* $variant, )*
        }

        impl ActionTag {
            /// Every action tag, in declaration order.
            pub const ALL: &'static [ActionTag] = &[ $( ActionTag::$variant, )* ];

            /// Returns the persisted string form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( ActionTag::$variant => $name, )*
                }
            }
        }

        impl FromStr for ActionTag {
            type Err = UnknownAction;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $name => Ok(ActionTag::$variant), )*
                    other => Err(UnknownAction(other.to_string())),
                }
            }
        }
    };
}

action_tags! {
    // PDF
    AwaitingTextForPdf => "awaiting_text_for_pdf",
    AwaitingImageForPdf => "awaiting_image_for_pdf",
    /// Collects photos until the user sends `done`.
    AwaitingImagesForPdf => "awaiting_images_for_pdf",

    // Images
    AwaitingFrameCount => "awaiting_frame_count",
    AwaitingVideoForImages => "awaiting_video_for_images",
    AwaitingImageForSticker => "awaiting_image_for_sticker",
    AwaitingImageForConversion => "awaiting_image_for_conversion",
    AwaitingImageForOcr => "awaiting_image_for_ocr",
    AwaitingJsonForImage => "awaiting_json_for_image",

    // Media
    AwaitingAudioForConversion => "awaiting_audio_for_conversion",
    AwaitingTargetAudioFormat => "awaiting_target_audio_format",
    AwaitingVideoForConversion => "awaiting_video_for_conversion",
    AwaitingTargetVideoFormat => "awaiting_target_video_format",
    AwaitingVideoForAudioExtraction => "awaiting_video_for_audio_extraction",

    // Developer tools
    AwaitingTextForBase64Encode => "awaiting_text_for_base64_encode",
    AwaitingTextForBase64Decode => "awaiting_text_for_base64_decode",
    AwaitingNpmSearchQuery => "awaiting_npm_search_query",
    AwaitingJsonForFormatting => "awaiting_json_for_formatting",
    AwaitingYamlForFormatting => "awaiting_yaml_for_formatting",

    // Data
    AwaitingJsonForCsv => "awaiting_json_for_csv",
    AwaitingCsvForJson => "awaiting_csv_for_json",
    AwaitingTextForCsv => "awaiting_text_for_csv",

    // Web
    AwaitingUrlForScreenshot => "awaiting_url_for_screenshot",
    AwaitingUrlForPdf => "awaiting_url_for_pdf",
    AwaitingUrlForMetadata => "awaiting_url_for_metadata",
    AwaitingUrlForLinks => "awaiting_url_for_links",
    AwaitingUrlForSource => "awaiting_url_for_source",
    AwaitingUrlForDownload => "awaiting_url_for_download",

    // Other utilities
    AwaitingTextForQr => "awaiting_text_for_qr",
    AwaitingUrlForShortening => "awaiting_url_for_shortening",
    AwaitingPasswordOptions => "awaiting_password_options",

    // Credentials
    AwaitingApiKeyToAdd => "awaiting_api_key_to_add",
    AwaitingApiKeyToDelete => "awaiting_api_key_to_delete",

    // AI chat
    AwaitingGeminiKeyForChat => "awaiting_gemini_key_for_chat",
    /// An open-ended session, ended by `/endchat`.
    AiChatActive => "ai_chat_active",

    // GitHub
    AwaitingToken => "awaiting_token",
    AwaitingRepoForInfo => "awaiting_repo_for_info",
    AwaitingRepoForCreation => "awaiting_repo_for_creation",
    AwaitingFileForUpload => "awaiting_file_for_upload",
    AwaitingUploadDetails => "awaiting_upload_details",
    AwaitingRepoForBranches => "awaiting_repo_for_branches",
    AwaitingRepoBranchForCommits => "awaiting_repo_branch_for_commits",
    AwaitingIssueDetails => "awaiting_issue_details",
    AwaitingSearchQuery => "awaiting_search_query",
    AwaitingUserSearchQuery => "awaiting_user_search_query",
    AwaitingUsernameForGists => "awaiting_username_for_gists",
    AwaitingCommitDetails => "awaiting_commit_details",

    // GitHub deep-search wizard
    AwaitingDeepSearchQuery => "awaiting_deep_search_query",
    AwaitingDeepSearchLanguage => "awaiting_deep_search_language",
    AwaitingDeepSearchStars => "awaiting_deep_search_stars",
    AwaitingDeepSearchSort => "awaiting_deep_search_sort",
}

impl ActionTag {
    /// Returns `true` for open-ended sessions that only `/endchat` closes.
    pub fn is_session(&self) -> bool {
        matches!(self, Self::AiChatActive)
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_string_forms_round_trip_and_are_unique() {
        let mut seen = HashSet::new();
        for tag in ActionTag::ALL {
            assert!(seen.insert(tag.as_str()), "duplicate tag {tag}");
            assert_eq!(tag.as_str().parse::<ActionTag>(), Ok(*tag));
        }
    }

    #[test]
    fn test_unknown_tag() {
        let err = "awaiting_something_removed".parse::<ActionTag>().unwrap_err();
        assert_eq!(err.0, "awaiting_something_removed");
    }

    #[test]
    fn test_session_tags() {
        assert!(ActionTag::AiChatActive.is_session());
        assert!(!ActionTag::AwaitingTextForPdf.is_session());
    }
}
