//! Menu and callback routing.
//!
//! A [`MenuRouter`] maps inline-button payloads to one of:
//!
//! - **Submenu**: re-render a menu in place, no state change
//! - **Start**: enter an action (Replace) and prompt for its input
//! - **Param**: a `prefix_<value>` selection that enters an action with the
//!   value stored in scratch
//! - **Dynamic**: an arbitrary handler, for selections that read state to
//!   build their reply (listing or testing stored credentials)
//!
//! Exact selections are matched before prefixes. Payloads the router does not
//! know fall through to the registry's callback handler for the pending action.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use oladizz_core::{ActionTag, Button, Document, Keyboard, Reply};
use serde_json::Value;

use crate::error::{FrameworkError, FrameworkResult};
use crate::handler::{ActionHandler, BoxedHandler, into_handler};
use crate::registry::ActionRegistry;

/// Builds the prompt for a parametrized selection.
pub type PromptFn = Arc<dyn Fn(&str) -> Reply + Send + Sync>;

/// Label of the button appended to every submenu.
pub const BACK_LABEL: &str = "⬅️ Back";

#[derive(Clone)]
enum Entry {
    Submenu(Reply),
    Start {
        action: ActionTag,
        scratch: Document,
        prompt: Reply,
    },
    Dynamic(BoxedHandler),
}

#[derive(Clone)]
enum PrefixEntry {
    Param {
        action: ActionTag,
        field: &'static str,
        prompt: PromptFn,
    },
    Dynamic(BoxedHandler),
}

/// A resolved selection.
pub enum Route<'a> {
    /// Show this menu in place of the pressed one.
    Submenu(&'a Reply),
    /// Enter `action` with `scratch` and send `prompt`.
    Start {
        action: ActionTag,
        scratch: Document,
        prompt: Reply,
    },
    /// Run a handler; `param` is set for prefixed selections.
    Dynamic {
        handler: &'a BoxedHandler,
        param: Option<&'a str>,
    },
}

/// Routes inline-button selections.
#[derive(Clone)]
pub struct MenuRouter {
    root: String,
    entries: HashMap<String, Entry>,
    prefixes: Vec<(String, PrefixEntry)>,
}

impl MenuRouter {
    /// Creates a router whose root menu is selected by `root`.
    pub fn new(root: impl Into<String>, text: impl Into<String>, keyboard: Keyboard) -> Self {
        let root = root.into();
        let mut entries = HashMap::new();
        entries.insert(
            root.clone(),
            Entry::Submenu(Reply::text(text).with_keyboard(keyboard)),
        );
        Self {
            root,
            entries,
            prefixes: Vec::new(),
        }
    }

    /// Adds a submenu; a Back button to `back` is appended as the last row.
    pub fn submenu(
        mut self,
        id: impl Into<String>,
        text: impl Into<String>,
        rows: Vec<Vec<Button>>,
        back: impl Into<String>,
    ) -> Self {
        let keyboard = Keyboard::new(rows).row(vec![Button::new(BACK_LABEL, back)]);
        self.entries.insert(
            id.into(),
            Entry::Submenu(Reply::text(text).with_keyboard(keyboard)),
        );
        self
    }

    /// Adds a selection that enters `action` with empty scratch.
    pub fn start(self, id: impl Into<String>, action: ActionTag, prompt: impl Into<Reply>) -> Self {
        self.start_with(id, action, Document::new(), prompt)
    }

    /// Adds a selection that enters `action` with initial scratch.
    pub fn start_with(
        mut self,
        id: impl Into<String>,
        action: ActionTag,
        scratch: Document,
        prompt: impl Into<Reply>,
    ) -> Self {
        self.entries.insert(
            id.into(),
            Entry::Start {
                action,
                scratch,
                prompt: prompt.into(),
            },
        );
        self
    }

    /// Adds a selection served by a handler.
    pub fn dynamic<H: ActionHandler>(mut self, id: impl Into<String>, handler: H) -> Self {
        self.entries
            .insert(id.into(), Entry::Dynamic(into_handler(handler)));
        self
    }

    /// Adds a `prefix<value>` selection storing `value` under `field`.
    pub fn param<F>(mut self, prefix: impl Into<String>, action: ActionTag, field: &'static str, prompt: F) -> Self
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        self.prefixes.push((
            prefix.into(),
            PrefixEntry::Param {
                action,
                field,
                prompt: Arc::new(prompt),
            },
        ));
        self
    }

    /// Adds a `prefix<value>` selection served by a handler.
    pub fn dynamic_prefix<H: ActionHandler>(mut self, prefix: impl Into<String>, handler: H) -> Self {
        self.prefixes
            .push((prefix.into(), PrefixEntry::Dynamic(into_handler(handler))));
        self
    }

    /// The payload that shows the root menu.
    pub fn root_id(&self) -> &str {
        &self.root
    }

    /// The root menu.
    pub fn root_menu(&self) -> Reply {
        match self.entries.get(&self.root) {
            Some(Entry::Submenu(reply)) => reply.clone(),
            _ => Reply::default(),
        }
    }

    /// Resolves a selection payload.
    pub fn resolve<'a>(&'a self, data: &'a str) -> Option<Route<'a>> {
        if let Some(entry) = self.entries.get(data) {
            return Some(match entry {
                Entry::Submenu(reply) => Route::Submenu(reply),
                Entry::Start {
                    action,
                    scratch,
                    prompt,
                } => Route::Start {
                    action: *action,
                    scratch: scratch.clone(),
                    prompt: prompt.clone(),
                },
                Entry::Dynamic(handler) => Route::Dynamic {
                    handler,
                    param: None,
                },
            });
        }

        self.prefixes.iter().find_map(|(prefix, entry)| {
            let value = data.strip_prefix(prefix.as_str())?;
            if value.is_empty() {
                return None;
            }
            Some(match entry {
                PrefixEntry::Param {
                    action,
                    field,
                    prompt,
                } => {
                    let mut scratch = Document::new();
                    scratch.insert((*field).to_string(), Value::String(value.to_string()));
                    Route::Start {
                        action: *action,
                        scratch,
                        prompt: prompt(value),
                    }
                }
                PrefixEntry::Dynamic(handler) => Route::Dynamic {
                    handler,
                    param: Some(value),
                },
            })
        })
    }

    /// Checks that every started action is registered and every static
    /// button routes somewhere.
    pub fn validate(&self, registry: &ActionRegistry) -> FrameworkResult<()> {
        let mut ids: Vec<&String> = self.entries.keys().collect();
        ids.sort();
        for id in ids {
            match &self.entries[id] {
                Entry::Start { action, .. } if !registry.contains(*action) => {
                    return Err(FrameworkError::UnhandledMenuAction {
                        entry: id.clone(),
                        action: *action,
                    });
                }
                Entry::Submenu(reply) => {
                    let keyboard = reply.keyboard.iter().flat_map(Keyboard::callbacks);
                    for selection in keyboard {
                        if self.resolve(selection).is_none() {
                            return Err(FrameworkError::DanglingButton {
                                menu: id.clone(),
                                selection: selection.to_string(),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        for (prefix, entry) in &self.prefixes {
            if let PrefixEntry::Param { action, .. } = entry
                && !registry.contains(*action)
            {
                return Err(FrameworkError::UnhandledMenuAction {
                    entry: format!("{prefix}*"),
                    action: *action,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MenuRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuRouter")
            .field("root", &self.root)
            .field("entries", &self.entries.len())
            .field("prefixes", &self.prefixes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ActionContext;
    use crate::error::HandlerResult;
    use crate::step::Step;
    use oladizz_core::EventKind;

    async fn noop(_ctx: ActionContext) -> HandlerResult {
        Ok(Step::no_change())
    }

    fn router() -> MenuRouter {
        MenuRouter::new(
            "main_menu",
            "Welcome",
            Keyboard::default().row(vec![Button::new("PDF", "pdf_tools")]),
        )
        .submenu(
            "pdf_tools",
            "📄 PDF Tools",
            vec![vec![Button::new("Text to PDF", "convert_text_to_pdf")]],
            "main_menu",
        )
        .start(
            "convert_text_to_pdf",
            ActionTag::AwaitingTextForPdf,
            "Okay, please send me the text you want to convert to PDF.",
        )
        .param(
            "format_",
            ActionTag::AwaitingImageForConversion,
            "format",
            |fmt| Reply::text(format!("Convert to {}", fmt.to_uppercase())),
        )
        .dynamic("format_special", noop)
    }

    #[test]
    fn test_submenu_has_back_button() {
        let router = router();
        let Some(Route::Submenu(reply)) = router.resolve("pdf_tools") else {
            panic!("expected submenu");
        };
        let callbacks: Vec<_> = reply.keyboard.iter().flat_map(Keyboard::callbacks).collect();
        assert_eq!(callbacks, vec!["convert_text_to_pdf", "main_menu"]);
    }

    #[test]
    fn test_param_selection_stores_value() {
        let router = router();
        let Some(Route::Start {
            action,
            scratch,
            prompt,
        }) = router.resolve("format_png")
        else {
            panic!("expected start");
        };
        assert_eq!(action, ActionTag::AwaitingImageForConversion);
        assert_eq!(scratch.get("format"), Some(&Value::String("png".into())));
        assert_eq!(prompt.text, "Convert to PNG");
    }

    #[test]
    fn test_exact_match_wins_over_prefix() {
        let router = router();
        assert!(matches!(
            router.resolve("format_special"),
            Some(Route::Dynamic { param: None, .. })
        ));
        assert!(router.resolve("format_").is_none());
        assert!(router.resolve("de_sort_stars").is_none());
    }

    #[test]
    fn test_validate() {
        let registry = ActionRegistry::new()
            .on(ActionTag::AwaitingTextForPdf, &[EventKind::Text], noop)
            .on(ActionTag::AwaitingImageForConversion, &[EventKind::Photo], noop);
        assert!(router().validate(&registry).is_ok());

        let err = router().validate(&ActionRegistry::new()).unwrap_err();
        assert!(matches!(err, FrameworkError::UnhandledMenuAction { .. }));

        let dangling = router().submenu(
            "broken",
            "Broken",
            vec![vec![Button::new("?", "nowhere")]],
            "main_menu",
        );
        assert!(matches!(
            dangling.validate(&registry),
            Err(FrameworkError::DanglingButton { .. })
        ));
    }
}
