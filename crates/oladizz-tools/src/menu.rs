//! The menu tree.

use oladizz_core::{ActionTag, Button, Document, Keyboard, Reply, fields};
use oladizz_framework::MenuRouter;
use serde_json::{Value, json};

use crate::handlers::{ai, github, keys};
use crate::media::TargetFormat;

/// Payload of the root menu.
pub const MAIN_MENU: &str = "main_menu";

pub const WELCOME: &str =
    "Welcome to the 𝕆𝕃𝔸𝔻𝕀ℤℤ bot! Please choose a category from the options below.";

fn b(label: &str, data: &str) -> Button {
    Button::new(label, data)
}

/// Initial scratch holding one field.
fn scratch(field: &str, value: Value) -> Document {
    let mut doc = Document::new();
    doc.insert(field.to_string(), value);
    doc
}

fn main_keyboard() -> Keyboard {
    Keyboard::new(vec![
        vec![b("🤖 Chat with AI", "ai_chat")],
        vec![
            b("📄 PDF Tools", "pdf_tools"),
            b("🖼️ Image Tools", "image_tools"),
            b("🎬 Media Tools", "media_tools"),
        ],
        vec![
            b("🛠️ Developer Tools", "dev_tools"),
            b("🕸️ Web Utilities", "web_utilities"),
            b("📊 Data Tools", "data_tools"),
        ],
        vec![
            b("🔑 API Management", "api_key_manager"),
            b("🔗 Other Utilities", "other_utilities"),
        ],
    ])
}

/// Builds the complete menu router.
pub fn menu() -> MenuRouter {
    let router = MenuRouter::new(MAIN_MENU, WELCOME, main_keyboard());
    let router = submenus(router);
    let router = starts(router);
    let router = github_starts(router);
    image_formats(router)
        .dynamic("ai_chat", ai::open_chat)
        .dynamic("api_key_list", keys::list)
        .dynamic("api_key_tester", keys::tester_menu)
        .dynamic_prefix(keys::TEST_PREFIX, keys::test)
}

fn submenus(router: MenuRouter) -> MenuRouter {
    router
        .submenu(
            "pdf_tools",
            "📄 PDF Tools",
            vec![
                vec![
                    b("Text to PDF", "convert_text_to_pdf"),
                    b("Image to PDF", "convert_image_to_pdf"),
                ],
                vec![b("Combine Images to PDF", "combine_images_to_pdf")],
            ],
            MAIN_MENU,
        )
        .submenu(
            "image_tools",
            "🖼️ Image Tools",
            vec![
                vec![b("Convert Format", "convert_image_format")],
                vec![b("To Sticker", "convert_to_sticker")],
                vec![b("Video to Images", "convert_video_to_images")],
                vec![b("JSON to Image", "json_to_image")],
                vec![b("OCR (Image to Text)", "ocr_image")],
            ],
            MAIN_MENU,
        )
        .submenu(
            "media_tools",
            "🎬 Media Tools",
            vec![
                vec![
                    b("Audio Format", "convert_audio_format"),
                    b("Video Format", "convert_video_format"),
                ],
                vec![b("Extract Audio", "extract_audio_from_video")],
            ],
            MAIN_MENU,
        )
        .submenu(
            "dev_tools",
            "🛠️ Developer Tools",
            vec![
                vec![b("GitHub", "github"), b("NPM Search", "npm_search")],
                vec![b("JSON/YAML", "json_yaml_tools"), b("Base64", "base64_tools")],
            ],
            MAIN_MENU,
        )
        .submenu(
            "web_utilities",
            "🕸️ Web Utilities",
            vec![
                vec![
                    b("Screenshot", "website_screenshot"),
                    b("Website to PDF", "website_to_pdf"),
                ],
                vec![
                    b("Get Metadata", "get_page_metadata"),
                    b("Extract Links", "extract_page_links"),
                ],
                vec![
                    b("View Source", "view_page_source"),
                    b("Download URL", "download_from_url"),
                ],
            ],
            MAIN_MENU,
        )
        .submenu(
            "api_key_manager",
            "🔑 API Management",
            vec![
                vec![b("Add/Update", "api_key_add"), b("List Keys", "api_key_list")],
                vec![b("Delete Key", "api_key_delete"), b("Test Keys", "api_key_tester")],
            ],
            MAIN_MENU,
        )
        .submenu(
            "other_utilities",
            "🔗 Other Utilities",
            vec![
                vec![
                    b("Generate QR Code", "generate_qr_code"),
                    b("Shorten URL", "shorten_url"),
                ],
                vec![b("Password Generator", "generate_password")],
            ],
            MAIN_MENU,
        )
        .submenu(
            "data_tools",
            "📊 Data Tools",
            vec![
                vec![b("JSON to CSV", "json_to_csv"), b("CSV to JSON", "csv_to_json")],
                vec![b("Text to CSV", "text_to_csv")],
            ],
            MAIN_MENU,
        )
        .submenu(
            "base64_tools",
            "Base64 Tools",
            vec![vec![b("Encode", "base64_encode"), b("Decode", "base64_decode")]],
            "dev_tools",
        )
        .submenu(
            "json_yaml_tools",
            "JSON/YAML Tools",
            vec![vec![b("Format JSON", "format_json")], vec![b("Format YAML", "format_yaml")]],
            "dev_tools",
        )
        .submenu(
            "convert_image_format",
            "Please choose the target format:",
            vec![
                TargetFormat::ALL
                    .iter()
                    .map(|f| b(&f.label(), &format!("format_{}", f.as_str())))
                    .collect(),
            ],
            "image_tools",
        )
        .submenu(
            "github",
            "GitHub Features:",
            vec![
                vec![b("Set Token", "set_token")],
                vec![
                    b("Get Repo Info", "get_repo_info"),
                    b("Search Repos", "search_repos"),
                ],
                vec![b("Deep Search Repos", "github_deep_search")],
                vec![
                    b("Create Repo", "create_repo"),
                    b("Upload File", "upload_file"),
                    b("Create Issue", "create_issue"),
                ],
                vec![
                    b("List Branches", "list_branches"),
                    b("List Commits", "list_commits"),
                    b("Get Commit", "github_get_commit"),
                ],
                vec![
                    b("Search Users", "github_search_users"),
                    b("List Gists", "github_list_gists"),
                ],
            ],
            "dev_tools",
        )
}

fn starts(router: MenuRouter) -> MenuRouter {
    use ActionTag::*;

    let prompts: [(&str, ActionTag, &str); 27] = [
        ("convert_text_to_pdf", AwaitingTextForPdf, "Okay, please send me the text you want to convert to PDF."),
        ("convert_image_to_pdf", AwaitingImageForPdf, "Okay, please send me the image you want to convert to PDF."),
        ("convert_video_to_images", AwaitingFrameCount, "How many frames would you like to extract from the video?"),
        ("convert_to_sticker", AwaitingImageForSticker, "Okay, please send me the image you want to convert to a sticker."),
        ("ocr_image", AwaitingImageForOcr, "Okay, please send me the image you want to extract text from."),
        ("json_to_image", AwaitingJsonForImage, "Okay, please send me the JSON you want to convert to an image."),
        ("generate_qr_code", AwaitingTextForQr, "Okay, please send me the text or URL to convert to a QR code."),
        ("shorten_url", AwaitingUrlForShortening, "Okay, please send me the URL you want to shorten."),
        ("base64_encode", AwaitingTextForBase64Encode, "Okay, please send me the text you want to encode to Base64."),
        ("base64_decode", AwaitingTextForBase64Decode, "Okay, please send me the Base64 string you want to decode."),
        ("npm_search", AwaitingNpmSearchQuery, "Okay, please send me the name of the NPM package you want to search for."),
        ("format_json", AwaitingJsonForFormatting, "Okay, please send me the JSON you want to format."),
        ("format_yaml", AwaitingYamlForFormatting, "Okay, please send me the YAML you want to format."),
        ("json_to_csv", AwaitingJsonForCsv, "Okay, please send me the JSON file you want to convert to CSV."),
        ("csv_to_json", AwaitingCsvForJson, "Okay, please send me the CSV file you want to convert to JSON."),
        ("text_to_csv", AwaitingTextForCsv, "Okay, please send me the text you want to convert to a CSV file. The first line should be the headers."),
        ("api_key_add", AwaitingApiKeyToAdd, "Please send the service name and the API key in the format `service_name your_api_key`.\n\nYour message will be deleted for security."),
        ("api_key_delete", AwaitingApiKeyToDelete, "Please send the service name of the key you want to delete."),
        ("website_screenshot", AwaitingUrlForScreenshot, "Okay, please send me the URL of the website to screenshot (e.g., https://google.com)."),
        ("website_to_pdf", AwaitingUrlForPdf, "Okay, please send me the URL of the website to convert to PDF (e.g., https://google.com)."),
        ("get_page_metadata", AwaitingUrlForMetadata, "Okay, please send me the URL of the website to get metadata from."),
        ("extract_page_links", AwaitingUrlForLinks, "Okay, please send me the URL to extract links from."),
        ("view_page_source", AwaitingUrlForSource, "Okay, please send me the URL to get the page source from."),
        ("download_from_url", AwaitingUrlForDownload, "Okay, please send me the URL of the file to download."),
        ("convert_audio_format", AwaitingAudioForConversion, "Okay, please send me the audio file you want to convert, then the target format (e.g., `mp3`, `wav`, `ogg`)."),
        ("convert_video_format", AwaitingVideoForConversion, "Okay, please send me the video file you want to convert, then the target format (e.g., `mp4`, `avi`, `mov`)."),
        ("extract_audio_from_video", AwaitingVideoForAudioExtraction, "Okay, please send me the video file from which you want to extract audio."),
    ];

    let router = prompts
        .into_iter()
        .fold(router, |router, (id, action, prompt)| {
            router.start(id, action, Reply::markdown(prompt))
        });

    router
        .start_with(
            "combine_images_to_pdf",
            AwaitingImagesForPdf,
            scratch(fields::IMAGES, json!([])),
            Reply::markdown("Okay, send the images to combine. Send 'done' when you are finished."),
        )
        .start(
            "generate_password",
            AwaitingPasswordOptions,
            Reply::markdown(
                "Please specify password length and options. Format: `<length> <options>`\n\n\
                 Options (combine them):\n`u` - Uppercase\n`l` - Lowercase\n`n` - Numbers\n`s` - Symbols\n\n\
                 Example: `16 ulns` (for a 16-char password with all character types)",
            ),
        )
}

fn github_starts(router: MenuRouter) -> MenuRouter {
    use ActionTag::*;

    let prompts: [(&str, ActionTag, &str); 12] = [
        ("set_token", AwaitingToken, "Please send me your GitHub Personal Access Token. I will delete your message for security."),
        ("get_repo_info", AwaitingRepoForInfo, "Please send me the repository in the format `owner/repo`."),
        ("create_repo", AwaitingRepoForCreation, "Please send the name for the new repository (e.g., `my-cool-repo`). Add `private` for a private repo."),
        ("upload_file", AwaitingFileForUpload, "Okay, please send me the file you want to upload."),
        ("list_branches", AwaitingRepoForBranches, "Please send the repository in the format `owner/repo`."),
        ("list_commits", AwaitingRepoBranchForCommits, "Please send the repository and branch in the format `owner/repo branch`."),
        ("create_issue", AwaitingIssueDetails, "Please send the issue details in the format `owner/repo | issue title | issue body`."),
        ("search_repos", AwaitingSearchQuery, "Please send your search query for repositories."),
        ("github_search_users", AwaitingUserSearchQuery, "Please send a username or email to search for."),
        ("github_list_gists", AwaitingUsernameForGists, "Please send the username to list their public gists."),
        ("github_get_commit", AwaitingCommitDetails, "Please send the repository and commit hash in the format `owner/repo commit_hash`."),
        ("github_deep_search", AwaitingDeepSearchQuery, github::DEEP_SEARCH_STEP_1),
    ];

    prompts
        .into_iter()
        .fold(router, |router, (id, action, prompt)| {
            router.start(id, action, Reply::markdown(prompt))
        })
}

fn image_formats(router: MenuRouter) -> MenuRouter {
    router.param(
        "format_",
        ActionTag::AwaitingImageForConversion,
        fields::FORMAT,
        |requested| {
            let label = requested
                .parse::<TargetFormat>()
                .map(|format| format.label())
                .unwrap_or_else(|_| requested.to_uppercase());
            Reply::markdown(format!(
                "Okay, please send me the image you want to convert to {label}."
            ))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use oladizz_framework::Route;

    #[test]
    fn test_every_start_enters_its_action() {
        let router = menu();
        match router.resolve("combine_images_to_pdf") {
            Some(Route::Start {
                action, scratch, ..
            }) => {
                assert_eq!(action, ActionTag::AwaitingImagesForPdf);
                assert_eq!(scratch.get(fields::IMAGES), Some(&json!([])));
            }
            _ => panic!("combine_images_to_pdf is not a start entry"),
        }
        match router.resolve("format_png") {
            Some(Route::Start { action, scratch, prompt }) => {
                assert_eq!(action, ActionTag::AwaitingImageForConversion);
                assert_eq!(scratch.get(fields::FORMAT), Some(&json!("png")));
                assert_eq!(prompt.text, "Okay, please send me the image you want to convert to PNG.");
            }
            _ => panic!("format_png is not a start entry"),
        }
        match router.resolve("format_tiff") {
            Some(Route::Start { scratch, .. }) => {
                assert_eq!(scratch.get(fields::FORMAT), Some(&json!("tiff")));
            }
            _ => panic!("format_tiff is not routed"),
        }
        // Exact entries win over the formatting tools sharing the prefix.
        assert!(matches!(
            router.resolve("format_json"),
            Some(Route::Start { action: ActionTag::AwaitingJsonForFormatting, .. })
        ));
    }

    #[test]
    fn test_nested_menus_go_back_to_parent() {
        let router = menu();
        for (menu, parent) in [
            ("base64_tools", "dev_tools"),
            ("json_yaml_tools", "dev_tools"),
            ("github", "dev_tools"),
            ("convert_image_format", "image_tools"),
            ("pdf_tools", MAIN_MENU),
        ] {
            let Some(Route::Submenu(reply)) = router.resolve(menu) else {
                panic!("{menu} is not a submenu");
            };
            let keyboard = reply.keyboard.as_ref().unwrap();
            assert_eq!(keyboard.callbacks().last(), Some(parent), "{menu}");
        }
    }

    #[test]
    fn test_root_menu() {
        let root = menu().root_menu();
        assert_eq!(root.text, WELCOME);
        assert_eq!(root.keyboard.unwrap().callbacks().count(), 9);
    }
}
