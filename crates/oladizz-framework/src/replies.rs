//! Fixed user-facing texts produced by the framework itself.

/// Non-command input while no operation is pending.
pub const FALLBACK: &str =
    "Please use the buttons to select a conversion type or send /start to see options.";

/// The stored action is not one the bot knows.
pub const STALE_ACTION: &str =
    "I'm not sure what to do with this. Please select an option from the /start menu.";

/// The state store could not be reached.
pub const TRY_AGAIN: &str = "Something went wrong on my side. Please try again.";

/// An accumulating step found its record gone.
pub const NO_LONGER_ACTIVE: &str =
    "That operation is no longer active. Send /start to begin again.";

/// Generic apology for unclassified failures.
pub const GENERIC_FAILURE: &str = "Sorry, something went wrong while processing your request.";

pub const CANCELLED: &str =
    "The current operation has been cancelled. Send /start to begin a new one.";
pub const NOTHING_TO_CANCEL: &str =
    "There is no operation to cancel. Send /start to see available options.";
pub const CHAT_ENDED: &str =
    "You have ended the chat with the AI. Send /start to see other options.";
pub const NO_ACTIVE_CHAT: &str = "You are not in an active AI chat session.";

/// Hint sent when the pending step does not accept the received kind.
pub fn wrong_kind(expected: &[&str]) -> String {
    let wanted = match expected {
        [] => "something else".to_string(),
        [one] => (*one).to_string(),
        [init @ .., last] => format!("{} or {last}", init.join(", ")),
    };
    format!("I'm waiting for {wanted}. Send /cancel to stop the current operation.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_kind_hint() {
        assert_eq!(
            wrong_kind(&["a photo"]),
            "I'm waiting for a photo. Send /cancel to stop the current operation."
        );
        assert_eq!(
            wrong_kind(&["a photo", "a text message"]),
            "I'm waiting for a photo or a text message. Send /cancel to stop the current operation."
        );
    }
}
