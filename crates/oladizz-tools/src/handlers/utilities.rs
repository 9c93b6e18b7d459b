//! Small text utilities: QR codes, link shortening, passwords, Base64, npm
//! search and JSON/YAML formatting.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use oladizz_core::{OutboundFile, Reply};
use oladizz_framework::{ActionContext, BackgroundTask, HandlerResult, Step};
use rand::Rng;
use rand::seq::SliceRandom;

use super::{send, text, working, workspace};
use crate::clients::{NpmClient, NpmPackage, Shortener};
use crate::error::ToolError;
use crate::media::MediaToolkit;

// =============================================================================
// QR code / shortening
// =============================================================================

pub async fn qr_code(ctx: ActionContext) -> HandlerResult {
    let toolkit = ctx.require::<dyn MediaToolkit>()?;
    let body = ctx.event().text_content().unwrap_or_default().to_string();

    let task = BackgroundTask::new(
        "qr_code",
        "Sorry, there was an error generating your QR code.",
        async move {
            let dir = workspace(&ctx, "qr").await?;
            let out = dir.join("qr.png");
            toolkit.qr_code(&body, &out).await?;
            send(&ctx, OutboundFile::photo(&out)).await?;
            Ok(Some(Reply::text(
                "QR code generated successfully! Send /start to do more.",
            )))
        },
    );
    Ok(working("Generating your QR code...", task))
}

pub async fn shorten(ctx: ActionContext) -> HandlerResult {
    let url = text(&ctx).to_string();
    if !url.starts_with("http") {
        return Ok(Step::clear().reply(
            "Please send a valid URL (e.g., starting with http:// or https://).",
        ));
    }
    let shortener = ctx.require::<Shortener>()?;

    let task = BackgroundTask::new(
        "shorten_url",
        "Sorry, there was an error connecting to the URL shortening service.",
        async move {
            match shortener.shorten(&url).await {
                Ok(short) => Ok(Some(Reply::text(format!("Shortened URL: {short}")))),
                Err(ToolError::Decode(answer)) => Ok(Some(Reply::text(format!(
                    "Sorry, there was an error shortening the URL. API returned: {answer}"
                )))),
                Err(e) => Err(e.into()),
            }
        },
    );
    Ok(working("Shortening your URL...", task))
}

// =============================================================================
// Passwords
// =============================================================================

/// How long a generated password stays in the chat.
pub const PASSWORD_TTL: Duration = Duration::from_secs(30);

pub const MAX_PASSWORD_LENGTH: usize = 1024;

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Generates a password of `length` characters from the sets named in
/// `options` (`u`, `l`, `n`, `s`).
///
/// Every selected set contributes at least one character when `length`
/// allows. Returns `None` if no set is selected.
pub fn generate_password(length: usize, options: &str) -> Option<String> {
    let sets: Vec<&[u8]> = [('u', UPPER), ('l', LOWER), ('n', DIGITS), ('s', SYMBOLS)]
        .into_iter()
        .filter(|(flag, _)| options.contains(*flag))
        .map(|(_, set)| set.as_bytes())
        .collect();
    if sets.is_empty() {
        return None;
    }

    let mut rng = rand::thread_rng();
    let mut chars: Vec<u8> = sets.iter().map(|set| set[rng.gen_range(0..set.len())]).collect();
    let charset: Vec<u8> = sets.concat();
    while chars.len() < length {
        chars.push(charset[rng.gen_range(0..charset.len())]);
    }
    chars.shuffle(&mut rng);
    chars.truncate(length);
    Some(chars.into_iter().map(char::from).collect())
}

pub async fn password(ctx: ActionContext) -> HandlerResult {
    let mut step = Step::clear();
    if let Some(id) = ctx.message_id() {
        step = step.delete(id);
    }

    let mut args = text(&ctx).split_whitespace();
    let length = match args.next().map(str::parse::<usize>) {
        Some(Ok(n)) if n > 0 => n,
        _ => return Ok(step.reply("Invalid length. Please provide a positive number.")),
    };
    if length > MAX_PASSWORD_LENGTH {
        return Ok(step.reply("Password length cannot exceed 1024 characters."));
    }
    let options = args.next().unwrap_or("ulns");
    let Some(password) = generate_password(length, options) else {
        return Ok(step.reply(
            "Invalid options. Please select at least one character type: u, l, n, s.",
        ));
    };

    let task = BackgroundTask::new(
        "password",
        "Sorry, I couldn't deliver your password. Please try again.",
        async move {
            let chat = ctx.chat();
            ctx.outbound()
                .send_text(
                    chat,
                    &Reply::text(
                        "⚠️ Here is your generated password. This message will be deleted in 30 seconds for your security. Please copy it and store it in a safe place. The bot will not save it.",
                    ),
                )
                .await?;
            let sent = ctx
                .outbound()
                .send_text(chat, &Reply::markdown(format!("```\n{password}\n```")))
                .await?;
            tokio::time::sleep(PASSWORD_TTL).await;
            if let Err(e) = ctx.outbound().delete_message(chat, sent).await {
                tracing::warn!(%chat, error = %e, "failed to delete password message");
            }
            Ok(None)
        },
    );
    Ok(step.spawn(task))
}

// =============================================================================
// Base64
// =============================================================================

pub async fn base64_encode(ctx: ActionContext) -> HandlerResult {
    let raw = ctx.event().text_content().unwrap_or_default();
    let encoded = STANDARD.encode(raw.as_bytes());
    Ok(Step::clear().reply(Reply::markdown(format!(
        "Encoded Text: \n```\n{encoded}\n```"
    ))))
}

pub async fn base64_decode(ctx: ActionContext) -> HandlerResult {
    let decoded = STANDARD
        .decode(text(&ctx).as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());
    let reply = match decoded {
        Some(decoded) => format!("Decoded Text:\n{decoded}"),
        None => "Invalid Base64 string. Please make sure you are sending a valid Base64-encoded text."
            .to_string(),
    };
    Ok(Step::clear().reply(reply))
}

// =============================================================================
// npm
// =============================================================================

fn npm_results(query: &str, packages: &[NpmPackage]) -> Reply {
    let mut message = format!("*Search results for \"{query}\":*\n\n");
    for pkg in packages {
        let homepage = pkg.links.homepage.clone().unwrap_or_else(|| pkg.npm_url());
        message.push_str(&format!(
            "*{}* (v{})\n[NPM]({}) | [Homepage]({homepage})\n{}\n\n",
            pkg.name,
            pkg.version,
            pkg.npm_url(),
            pkg.description.as_deref().unwrap_or("No description"),
        ));
    }
    Reply::markdown(message).without_preview()
}

pub async fn npm_search(ctx: ActionContext) -> HandlerResult {
    let npm = ctx.require::<NpmClient>()?;
    let query = text(&ctx).to_string();
    let progress = format!("Searching for NPM package: \"{query}\"...");

    let task = BackgroundTask::new(
        "npm_search",
        "Sorry, there was an error connecting to the NPM registry.",
        async move {
            match npm.search(&query).await {
                Ok(packages) if packages.is_empty() => {
                    Ok(Some(Reply::text("No packages found for your query.")))
                }
                Ok(packages) => Ok(Some(npm_results(&query, &packages))),
                Err(e) if e.status().is_some() => Ok(Some(Reply::text(
                    "Sorry, there was an error searching the NPM registry.",
                ))),
                Err(e) => Err(e.into()),
            }
        },
    );
    Ok(working(&progress, task))
}

// =============================================================================
// JSON / YAML formatting
// =============================================================================

pub async fn format_json(ctx: ActionContext) -> HandlerResult {
    let reply = match serde_json::from_str::<serde_json::Value>(text(&ctx)) {
        Ok(value) => Reply::markdown(format!(
            "Formatted JSON:\n```json\n{}\n```",
            serde_json::to_string_pretty(&value).map_err(ToolError::from)?
        )),
        Err(e) => Reply::text(format!("Invalid JSON: {e}")),
    };
    Ok(Step::clear().reply(reply))
}

pub async fn format_yaml(ctx: ActionContext) -> HandlerResult {
    let reply = match serde_yaml::from_str::<serde_yaml::Value>(text(&ctx)) {
        Ok(value) => {
            let dumped = serde_yaml::to_string(&value).map_err(ToolError::decode)?;
            Reply::markdown(format!("Formatted YAML:\n```yaml\n{}\n```", dumped.trim_end()))
        }
        Err(e) => Reply::text(format!("Invalid YAML: {e}")),
    };
    Ok(Step::clear().reply(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Harness;
    use oladizz_core::MessageId;
    use oladizz_framework::testing::Recorded;

    #[test]
    fn test_generate_password() {
        let pw = generate_password(12, "n").unwrap();
        assert_eq!(pw.len(), 12);
        assert!(pw.chars().all(|c| c.is_ascii_digit()));

        let pw = generate_password(40, "ulns").unwrap();
        assert!(pw.chars().any(|c| c.is_ascii_uppercase()));
        assert!(pw.chars().any(|c| c.is_ascii_lowercase()));
        assert!(pw.chars().any(|c| c.is_ascii_digit()));
        assert!(pw.chars().any(|c| SYMBOLS.contains(c)));

        assert_eq!(generate_password(2, "ulns").unwrap().len(), 2);
        assert_eq!(generate_password(8, "xyz"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_password_is_deleted_later() {
        let h = Harness::new().await;
        h.press(1, "generate_password").await;
        h.text(1, "16 ul").await;

        assert_eq!(h.doc(1).await, None);
        let texts = h.texts();
        let password = texts
            .last()
            .and_then(|t| t.strip_prefix("```\n"))
            .and_then(|t| t.strip_suffix("\n```"))
            .unwrap()
            .to_string();
        assert_eq!(password.len(), 16);
        assert!(password.chars().all(|c| c.is_ascii_alphabetic()));

        // The user's message goes first, the password message after the delay.
        let deleted = h.outbound.deleted();
        assert_eq!(deleted[0], MessageId(7));
        assert_eq!(deleted.len(), 2);
        let last = h.outbound.records().into_iter().last().unwrap();
        assert!(matches!(last, Recorded::Delete { .. }));
    }

    #[tokio::test]
    async fn test_password_bad_length_clears() {
        let h = Harness::new().await;
        h.press(1, "generate_password").await;
        h.text(1, "2000").await;
        assert_eq!(h.last_text(), "Password length cannot exceed 1024 characters.");
        assert_eq!(h.doc(1).await, None);
        assert_eq!(h.outbound.deleted(), vec![MessageId(7)]);
    }

    #[tokio::test]
    async fn test_base64_round_trip_replies() {
        let h = Harness::new().await;
        h.press(1, "base64_encode").await;
        h.text(1, "hello").await;
        assert_eq!(h.last_text(), "Encoded Text: \n```\naGVsbG8=\n```");

        h.press(1, "base64_decode").await;
        h.text(1, "aGVsbG8=").await;
        assert_eq!(h.last_text(), "Decoded Text:\nhello");

        h.press(1, "base64_decode").await;
        h.text(1, "%%%").await;
        assert!(h.last_text().starts_with("Invalid Base64 string."));
        assert_eq!(h.doc(1).await, None);
    }

    #[tokio::test]
    async fn test_shorten_url() {
        let h = Harness::new().await;
        h.server.route("GET /api-create.php", 200, "https://tinyurl.com/xyz");
        h.press(1, "shorten_url").await;
        h.text(1, "https://example.com/very/long").await;
        assert_eq!(h.last_text(), "Shortened URL: https://tinyurl.com/xyz");

        h.server.route("GET /api-create.php", 400, "Error");
        h.press(1, "shorten_url").await;
        h.text(1, "https://example.com").await;
        assert_eq!(
            h.last_text(),
            "Sorry, there was an error shortening the URL. API returned: Error"
        );

        h.press(1, "shorten_url").await;
        h.text(1, "example.com").await;
        assert_eq!(
            h.last_text(),
            "Please send a valid URL (e.g., starting with http:// or https://)."
        );
    }

    #[tokio::test]
    async fn test_npm_search_results() {
        let h = Harness::new().await;
        h.server.route(
            "GET /-/v1/search",
            200,
            r#"{"objects":[{"package":{"name":"left-pad","version":"1.3.0","description":"Pads","links":{}}}]}"#,
        );
        h.press(1, "npm_search").await;
        h.text(1, "pad").await;
        let reply = h.outbound.last_reply().unwrap();
        assert!(reply.disable_preview);
        assert_eq!(
            reply.text,
            "*Search results for \"pad\":*\n\n*left-pad* (v1.3.0)\n[NPM](https://www.npmjs.com/package/left-pad) | [Homepage](https://www.npmjs.com/package/left-pad)\nPads\n\n"
        );

        h.server.route("GET /-/v1/search", 200, r#"{"objects":[]}"#);
        h.press(1, "npm_search").await;
        h.text(1, "nothing").await;
        assert_eq!(h.last_text(), "No packages found for your query.");

        h.server.route("GET /-/v1/search", 500, "{}");
        h.press(1, "npm_search").await;
        h.text(1, "x").await;
        assert_eq!(h.last_text(), "Sorry, there was an error searching the NPM registry.");
    }

    #[tokio::test]
    async fn test_format_json_and_yaml() {
        let h = Harness::new().await;
        h.press(1, "format_json").await;
        h.text(1, r#"{"b":1,"a":[true]}"#).await;
        assert_eq!(
            h.last_text(),
            "Formatted JSON:\n```json\n{\n  \"b\": 1,\n  \"a\": [\n    true\n  ]\n}\n```"
        );

        h.press(1, "format_json").await;
        h.text(1, "{").await;
        assert!(h.last_text().starts_with("Invalid JSON: "));
        assert_eq!(h.doc(1).await, None);

        h.press(1, "format_yaml").await;
        h.text(1, "a:   1\nb: [x, y]").await;
        assert_eq!(
            h.last_text(),
            "Formatted YAML:\n```yaml\na: 1\nb:\n- x\n- y\n```"
        );
    }
}
