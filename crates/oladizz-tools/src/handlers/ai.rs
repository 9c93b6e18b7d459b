//! AI chat sessions backed by Gemini.

use oladizz_core::{ActionTag, ChatAction, FieldUpdate, Reply, fields};
use oladizz_framework::{ActionContext, HandlerResult, Step};
use serde_json::Value;

use super::text;
use crate::clients::{ChatTurn, GeminiClient, GeminiError};

const GEMINI: &str = "gemini";

fn gemini_key_path() -> String {
    format!("{}.{GEMINI}", fields::API_KEYS)
}

/// Opens a session, or asks for a key first.
pub async fn open_chat(ctx: ActionContext) -> HandlerResult {
    if ctx.scratch().api_key(GEMINI).is_some() {
        return Ok(Step::replace(ActionTag::AiChatActive).reply(
            "You can now chat with the AI using Gemini 2.5 Flash. To end the conversation, send /endchat command.",
        ));
    }
    Ok(Step::replace(ActionTag::AwaitingGeminiKeyForChat)
        .reply("To use the AI Chat, please send me your Google AI Studio API key."))
}

pub async fn save_key(ctx: ActionContext) -> HandlerResult {
    let key = text(&ctx).to_string();
    let mut step = Step::advance(
        ActionTag::AiChatActive,
        vec![
            FieldUpdate::set(gemini_key_path(), key),
            FieldUpdate::set(fields::CHAT_HISTORY, Value::Array(Vec::new())),
        ],
    );
    if let Some(id) = ctx.message_id() {
        step = step.delete(id);
    }
    Ok(step.reply("API key saved. You can now chat with the AI. Send '/endchat' to stop."))
}

/// One exchange: the prompt and the answer are appended together.
pub async fn chat_turn(ctx: ActionContext) -> HandlerResult {
    let Some(key) = ctx.scratch().api_key(GEMINI).map(str::to_string) else {
        return Ok(Step::clear().reply(
            "Google AI Studio API key not found. Please set it again via the 'Chat with AI' button.",
        ));
    };
    let gemini = ctx.require::<GeminiClient>()?;
    let prompt = text(&ctx).to_string();
    let history = ChatTurn::parse_history(ctx.scratch().get(fields::CHAT_HISTORY));

    if let Err(e) = ctx
        .outbound()
        .send_chat_action(ctx.chat(), ChatAction::Typing)
        .await
    {
        tracing::debug!(chat = %ctx.chat(), error = %e, "typing indicator failed");
    }

    match gemini.chat(&key, &history, &prompt).await {
        Ok(answer) => {
            let turns = [ChatTurn::user(prompt), ChatTurn::assistant(answer.clone())]
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()
                .map_err(crate::error::ToolError::from)?;
            Ok(Step::accumulate(vec![FieldUpdate::append(fields::CHAT_HISTORY, turns)])
                .reply(answer))
        }
        Err(GeminiError::Status { status, message }) => {
            let mut apology = format!("Sorry, an error occurred with the AI service (Status: {status}).");
            if let Some(details) = message {
                apology.push_str(&format!("\nDetails: {details}"));
            }
            if matches!(status, 400 | 403) {
                tracing::info!(chat = %ctx.chat(), status, "removing rejected Gemini key");
                return Ok(Step::accumulate(vec![
                    FieldUpdate::delete(gemini_key_path()),
                    FieldUpdate::delete(fields::ACTION),
                    FieldUpdate::delete(fields::CHAT_HISTORY),
                ])
                .reply(apology)
                .reply(
                    "Your Google AI Studio API key seems to be invalid. I've removed it. Please set it again.",
                ));
            }
            Ok(Step::no_change().reply(apology))
        }
        Err(GeminiError::Empty) => Ok(Step::no_change()
            .reply("Sorry, the AI returned an empty or invalid response.")),
        Err(GeminiError::Parse(detail)) => {
            tracing::warn!(chat = %ctx.chat(), %detail, "unparsable Gemini answer");
            Ok(Step::no_change().reply("Sorry, I had trouble understanding the AI's response."))
        }
        Err(GeminiError::Transport(e)) => {
            tracing::warn!(chat = %ctx.chat(), error = %e, "Gemini unreachable");
            Ok(Step::no_change()
                .reply("Sorry, I couldn't reach the AI service. Please try again in a moment."))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::Harness;
    use oladizz_core::MessageId;
    use serde_json::json;

    const PATH: &str = "POST /v1beta/models/gemini-2.5-flash:generateContent";

    #[tokio::test]
    async fn test_key_then_chat_appends_both_turns() {
        let h = Harness::new().await;
        h.server.route(
            PATH,
            200,
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello human"}]}}]}"#,
        );

        h.press(1, "ai_chat").await;
        assert_eq!(h.action(1).await.as_deref(), Some("awaiting_gemini_key_for_chat"));
        h.text(1, "AIza-key").await;
        assert_eq!(h.outbound.deleted(), vec![MessageId(7)]);
        assert_eq!(
            h.doc(1).await,
            Some(json!({
                "action": "ai_chat_active",
                "api_keys": { "gemini": "AIza-key" },
                "chat_history": [],
            }))
        );

        h.text(1, "hi").await;
        assert_eq!(h.last_text(), "Hello human");
        assert_eq!(
            h.doc(1).await.unwrap()["chat_history"],
            json!([
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "Hello human" },
            ])
        );
        assert_eq!(h.server.seen()[0].query, "key=AIza-key");

        h.text(1, "/endchat").await;
        assert_eq!(h.doc(1).await.unwrap().get("action"), None);
    }

    #[tokio::test]
    async fn test_stored_key_opens_session_directly() {
        let h = Harness::new().await;
        h.seed(1, json!({ "api_keys": { "gemini": "k" } })).await;
        h.press(1, "ai_chat").await;
        assert_eq!(h.action(1).await.as_deref(), Some("ai_chat_active"));
        assert!(h.last_text().starts_with("You can now chat with the AI"));
    }

    #[tokio::test]
    async fn test_rejected_key_is_removed() {
        let h = Harness::new().await;
        h.server.route(PATH, 400, r#"{"error":{"message":"API key not valid"}}"#);
        h.seed(
            1,
            json!({
                "action": "ai_chat_active",
                "api_keys": { "gemini": "bad", "openai": "sk" },
                "chat_history": [],
            }),
        )
        .await;

        h.text(1, "hi").await;
        let texts = h.texts();
        assert_eq!(
            texts[texts.len() - 2..],
            [
                "Sorry, an error occurred with the AI service (Status: 400).\nDetails: API key not valid".to_string(),
                "Your Google AI Studio API key seems to be invalid. I've removed it. Please set it again.".to_string(),
            ]
        );
        assert_eq!(h.doc(1).await, Some(json!({ "api_keys": { "openai": "sk" } })));
    }

    #[tokio::test]
    async fn test_server_error_keeps_session() {
        let h = Harness::new().await;
        h.server.route(PATH, 500, "oops");
        h.seed(1, json!({ "action": "ai_chat_active", "api_keys": { "gemini": "k" } }))
            .await;
        h.text(1, "hi").await;
        assert_eq!(
            h.last_text(),
            "Sorry, an error occurred with the AI service (Status: 500)."
        );
        assert_eq!(h.action(1).await.as_deref(), Some("ai_chat_active"));
    }
}
