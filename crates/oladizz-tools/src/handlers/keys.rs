//! Per-chat API key management.
//!
//! Keys live under `api_keys.<service>` in the chat record and survive
//! `/cancel` and every completed operation.

use oladizz_core::{Button, FieldUpdate, Keyboard, Reply, fields};
use oladizz_framework::{ActionContext, BACK_LABEL, BackgroundTask, HandlerError, HandlerResult, Step};

use super::text;
use crate::clients::{KeyCheck, KeyTester};

/// Callback prefix of the per-key test buttons.
pub const TEST_PREFIX: &str = "test_api_key_";

fn key_path(service: &str) -> String {
    format!("{}.{service}", fields::API_KEYS)
}

/// `service_name your_api_key` stores a key and deletes the user's message.
pub async fn add(ctx: ActionContext) -> HandlerResult {
    let Some((service, key)) = text(&ctx)
        .split_once(char::is_whitespace)
        .map(|(s, k)| (s.to_string(), k.trim().to_string()))
        .filter(|(_, k)| !k.is_empty())
    else {
        return Err(HandlerError::validation(
            "Invalid format. Please use `service_name your_api_key`.",
        ));
    };
    if service.contains('.') {
        return Err(HandlerError::validation(
            "Service names cannot contain dots. Please try again.",
        ));
    }

    let mut step = Step::accumulate(vec![
        FieldUpdate::set(key_path(&service), key),
        FieldUpdate::delete(fields::ACTION),
    ]);
    if let Some(id) = ctx.message_id() {
        step = step.delete(id);
    }
    Ok(step.reply(Reply::markdown(format!(
        "API key for `{service}` has been saved."
    ))))
}

pub async fn delete(ctx: ActionContext) -> HandlerResult {
    let service = text(&ctx).to_string();
    if ctx.scratch().api_key(&service).is_none() {
        return Ok(Step::clear().reply(Reply::markdown(format!(
            "No API key found for a service named `{service}`."
        ))));
    }
    Ok(Step::accumulate(vec![
        FieldUpdate::delete(key_path(&service)),
        FieldUpdate::delete(fields::ACTION),
    ])
    .reply(Reply::markdown(format!(
        "API key for `{service}` has been deleted."
    ))))
}

pub async fn list(ctx: ActionContext) -> HandlerResult {
    let keys = ctx.scratch().api_keys();
    if keys.is_empty() {
        return Ok(Step::no_change().reply("You have no API keys stored."));
    }
    let mut message = "You have API keys stored:\n".to_string();
    for service in keys.keys() {
        message.push_str(&format!("- `{service}`\n"));
    }
    Ok(Step::no_change().reply(Reply::markdown(message)))
}

/// Shows one test button per stored key in place of the menu.
pub async fn tester_menu(ctx: ActionContext) -> HandlerResult {
    let keys = ctx.scratch().api_keys();
    if keys.is_empty() {
        return Ok(Step::no_change().reply("You have no API keys stored to test."));
    }
    let keyboard = keys
        .keys()
        .fold(Keyboard::default(), |kb, service| {
            kb.row(vec![Button::new(
                format!("Test: {service}"),
                format!("{TEST_PREFIX}{service}"),
            )])
        })
        .row(vec![Button::new(BACK_LABEL, "api_key_manager")]);
    let menu = Reply::text("Select an API key to test:").with_keyboard(keyboard);
    Ok(match ctx.callback_message() {
        Some(message) => Step::no_change().edit(message, menu),
        None => Step::no_change().reply(menu),
    })
}

pub async fn test(ctx: ActionContext) -> HandlerResult {
    let service = ctx.param().unwrap_or_default().to_string();
    let Some(key) = ctx.scratch().api_key(&service).map(str::to_string) else {
        return Ok(Step::no_change().reply(Reply::markdown(format!(
            "Could not find a stored API key for `{service}`."
        ))));
    };
    let tester = ctx.require::<KeyTester>()?;
    if !tester.supports(&service) {
        return Ok(Step::no_change().reply(format!(
            "Sorry, testing for the service \"{service}\" is not supported yet."
        )));
    }

    let progress = Reply::markdown(format!("Testing API key for `{service}`..."));
    let failure = Reply::markdown(format!(
        "❌ An error occurred while trying to test your API key for `{service}`. This might be a connection issue or an invalid service name. Please try again."
    ));
    let task = BackgroundTask::new("test_api_key", failure, async move {
        let message = match tester.test(&service, &key).await? {
            KeyCheck::Working(status) => {
                format!("✅ Your API key for `{service}` is working! (Status: {status})")
            }
            KeyCheck::Rejected(status) => format!(
                "❌ Your API key for `{service}` is NOT working. (Status: {status}). Please check your key or its permissions."
            ),
            KeyCheck::Unsupported => format!(
                "Sorry, testing for the service \"{service}\" is not supported yet."
            ),
        };
        Ok(Some(Reply::markdown(message)))
    });
    Ok(Step::no_change().reply(progress).spawn(task))
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::Harness;
    use oladizz_core::MessageId;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_key_keeps_other_fields() {
        let h = Harness::new().await;
        h.seed(1, json!({ "github_pat": "ghp" })).await;
        h.press(1, "api_key_add").await;

        h.text(1, "openai").await;
        assert_eq!(h.last_text(), "Invalid format. Please use `service_name your_api_key`.");
        assert_eq!(h.action(1).await.as_deref(), Some("awaiting_api_key_to_add"));

        h.text(1, "openai sk-123 456").await;
        assert_eq!(
            h.doc(1).await,
            Some(json!({ "github_pat": "ghp", "api_keys": { "openai": "sk-123 456" } }))
        );
        assert_eq!(h.outbound.deleted(), vec![MessageId(7)]);
        assert_eq!(h.last_text(), "API key for `openai` has been saved.");
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let h = Harness::new().await;
        h.seed(1, json!({ "api_keys": { "openai": "a", "stripe": "b" } })).await;

        h.press(1, "api_key_list").await;
        assert_eq!(h.last_text(), "You have API keys stored:\n- `openai`\n- `stripe`\n");

        h.press(1, "api_key_delete").await;
        h.text(1, "stripe").await;
        assert_eq!(h.last_text(), "API key for `stripe` has been deleted.");
        assert_eq!(h.doc(1).await, Some(json!({ "api_keys": { "openai": "a" } })));

        h.press(1, "api_key_delete").await;
        h.text(1, "nope").await;
        assert_eq!(h.last_text(), "No API key found for a service named `nope`.");
        assert_eq!(h.action(1).await, None);
    }

    #[tokio::test]
    async fn test_tester_menu_and_test() {
        let h = Harness::new().await;
        h.server.route("GET /openai/models", 200, "{}");
        h.server.route("GET /user", 401, "{}");
        h.seed(1, json!({ "api_keys": { "openai": "sk", "github": "gh", "acme": "x" } }))
            .await;

        h.press(1, "api_key_tester").await;
        let menu = h.outbound.edits();
        assert_eq!(menu, vec!["Select an API key to test:".to_string()]);

        h.press(1, "test_api_key_openai").await;
        assert_eq!(
            h.last_text(),
            "✅ Your API key for `openai` is working! (Status: 200)"
        );
        let seen = h.server.seen();
        assert_eq!(seen[0].headers["authorization"], "Bearer sk");

        h.press(1, "test_api_key_github").await;
        assert!(h.last_text().starts_with("❌ Your API key for `github` is NOT working. (Status: 401)."));
        assert_eq!(h.server.seen()[1].headers["authorization"], "token gh");

        h.press(1, "test_api_key_acme").await;
        assert_eq!(
            h.last_text(),
            "Sorry, testing for the service \"acme\" is not supported yet."
        );

        h.press(1, "test_api_key_missing").await;
        assert_eq!(h.last_text(), "Could not find a stored API key for `missing`.");
        assert_eq!(h.doc(1).await.unwrap().get("action"), None);
    }

    #[tokio::test]
    async fn test_no_keys_to_test() {
        let h = Harness::new().await;
        h.press(1, "api_key_tester").await;
        assert_eq!(h.last_text(), "You have no API keys stored to test.");
        h.press(1, "api_key_list").await;
        assert_eq!(h.last_text(), "You have no API keys stored.");
    }
}
