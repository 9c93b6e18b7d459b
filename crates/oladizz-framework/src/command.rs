//! The fixed command table.
//!
//! Commands bypass state routing entirely: they are answered the same way no
//! matter which action is pending.

use oladizz_core::{ActionSlot, ChatState, Command, Reply};

use crate::replies;
use crate::step::Step;

/// Computes the step for a control command.
///
/// Returns `None` for commands the bot does not know; those are ignored.
pub fn run_command(command: &Command, state: &ChatState, main_menu: &Reply) -> Option<Step> {
    match command {
        Command::Start => Some(Step::no_change().reply(main_menu.clone())),
        Command::Cancel => Some(if state.action().is_set() {
            Step::discard().reply(replies::CANCELLED)
        } else {
            Step::no_change().reply(replies::NOTHING_TO_CANCEL)
        }),
        Command::EndChat => Some(match state.action() {
            ActionSlot::Pending(tag) if tag.is_session() => {
                Step::clear().reply(replies::CHAT_ENDED)
            }
            _ => Step::no_change().reply(replies::NO_ACTIVE_CHAT),
        }),
        Command::Unknown(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oladizz_core::{ChatId, Document, Transition};
    use serde_json::json;

    fn state(value: serde_json::Value) -> ChatState {
        let doc: Document = value.as_object().cloned().unwrap_or_default();
        ChatState::from_document(ChatId(1), Some(doc))
    }

    #[test]
    fn test_cancel_clears_any_action() {
        for raw in ["awaiting_text_for_pdf", "ai_chat_active", "awaiting_removed_thing"] {
            let step =
                run_command(&Command::Cancel, &state(json!({ "action": raw })), &Reply::default())
                    .unwrap();
            assert_eq!(step.transition, Transition::Discard);
            assert_eq!(step.texts(), vec![replies::CANCELLED]);
        }
    }

    #[test]
    fn test_cancel_without_action() {
        let absent = ChatState::absent(ChatId(1));
        let step = run_command(&Command::Cancel, &absent, &Reply::default()).unwrap();
        assert_eq!(step.transition, Transition::NoChange);
        assert_eq!(step.texts(), vec![replies::NOTHING_TO_CANCEL]);

        // Credentials alone are not an operation.
        let keys_only = state(json!({ "api_keys": { "gemini": "k" } }));
        let step = run_command(&Command::Cancel, &keys_only, &Reply::default()).unwrap();
        assert_eq!(step.transition, Transition::NoChange);
    }

    #[test]
    fn test_endchat_only_in_session() {
        let in_chat = state(json!({ "action": "ai_chat_active", "chat_history": [] }));
        let step = run_command(&Command::EndChat, &in_chat, &Reply::default()).unwrap();
        assert_eq!(step.transition, Transition::Clear);

        let elsewhere = state(json!({ "action": "awaiting_text_for_pdf" }));
        let step = run_command(&Command::EndChat, &elsewhere, &Reply::default()).unwrap();
        assert_eq!(step.transition, Transition::NoChange);
        assert_eq!(step.texts(), vec![replies::NO_ACTIVE_CHAT]);
    }

    #[test]
    fn test_start_sends_menu_and_unknown_is_ignored() {
        let menu = Reply::text("Welcome");
        let step = run_command(&Command::Start, &ChatState::absent(ChatId(1)), &menu).unwrap();
        assert_eq!(step.transition, Transition::NoChange);
        assert_eq!(step.texts(), vec!["Welcome"]);

        assert!(run_command(
            &Command::Unknown("help".into()),
            &ChatState::absent(ChatId(1)),
            &menu
        )
        .is_none());
    }
}
