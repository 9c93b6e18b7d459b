//! Action registry.
//!
//! A static table from `(ActionTag, EventKind)` to a handler. Several tags may
//! share one event kind, and one tag may have handlers for several kinds
//! (e.g. a step accepting either a photo or a `done` text).
//!
//! [`validate`](ActionRegistry::validate) runs at startup and fails if any
//! tag in [`ActionTag::ALL`] lacks a handler, so a newly added tag cannot be
//! silently unroutable.

use std::collections::HashMap;
use std::fmt;

use oladizz_core::{ActionTag, EventKind};

use crate::error::{FrameworkError, FrameworkResult};
use crate::handler::{ActionHandler, BoxedHandler, into_handler};

#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<(ActionTag, EventKind), BoxedHandler>,
    duplicates: Vec<(ActionTag, EventKind)>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `tag` on each of `kinds`.
    pub fn on<H: ActionHandler>(self, tag: ActionTag, kinds: &[EventKind], handler: H) -> Self {
        self.on_boxed(tag, kinds, into_handler(handler))
    }

    /// Registers a pre-built boxed handler.
    pub fn on_boxed(mut self, tag: ActionTag, kinds: &[EventKind], handler: BoxedHandler) -> Self {
        for kind in kinds {
            if self
                .handlers
                .insert((tag, *kind), handler.clone())
                .is_some()
            {
                self.duplicates.push((tag, *kind));
            }
        }
        self
    }

    /// Merges another registry into this one.
    pub fn merge(mut self, other: ActionRegistry) -> Self {
        for ((tag, kind), handler) in other.handlers {
            if self.handlers.insert((tag, kind), handler).is_some() {
                self.duplicates.push((tag, kind));
            }
        }
        self.duplicates.extend(other.duplicates);
        self
    }

    /// Resolves the handler for a pending tag and an event kind.
    pub fn lookup(&self, tag: ActionTag, kind: EventKind) -> Option<&BoxedHandler> {
        self.handlers.get(&(tag, kind))
    }

    /// Event kinds accepted by `tag`, in [`EventKind::ALL`] order.
    pub fn kinds_for(&self, tag: ActionTag) -> Vec<EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(|kind| self.handlers.contains_key(&(tag, *kind)))
            .collect()
    }

    /// Returns `true` if `tag` has a handler for any kind.
    pub fn contains(&self, tag: ActionTag) -> bool {
        EventKind::ALL
            .iter()
            .any(|kind| self.handlers.contains_key(&(tag, *kind)))
    }

    /// Number of `(tag, kind)` entries.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Checks that every action tag is routable and none is registered twice.
    pub fn validate(&self) -> FrameworkResult<()> {
        if let Some((tag, kind)) = self.duplicates.first() {
            return Err(FrameworkError::DuplicateHandler {
                tag: *tag,
                kind: *kind,
            });
        }
        match ActionTag::ALL.iter().find(|tag| !self.contains(**tag)) {
            Some(tag) => Err(FrameworkError::UnregisteredAction(*tag)),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("entries", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ActionContext;
    use crate::error::HandlerResult;
    use crate::step::Step;

    async fn noop(_ctx: ActionContext) -> HandlerResult {
        Ok(Step::no_change())
    }

    fn complete() -> ActionRegistry {
        ActionTag::ALL.iter().fold(ActionRegistry::new(), |reg, tag| {
            reg.on(*tag, &[EventKind::Text], noop)
        })
    }

    #[test]
    fn test_lookup_by_tag_and_kind() {
        let registry = ActionRegistry::new().on(
            ActionTag::AwaitingImagesForPdf,
            &[EventKind::Photo, EventKind::Text],
            noop,
        );
        assert!(registry
            .lookup(ActionTag::AwaitingImagesForPdf, EventKind::Photo)
            .is_some());
        assert!(registry
            .lookup(ActionTag::AwaitingImagesForPdf, EventKind::Video)
            .is_none());
        assert_eq!(
            registry.kinds_for(ActionTag::AwaitingImagesForPdf),
            vec![EventKind::Text, EventKind::Photo]
        );
    }

    #[test]
    fn test_validate_reports_missing_tag() {
        let err = ActionRegistry::new()
            .on(ActionTag::AwaitingTextForPdf, &[EventKind::Text], noop)
            .validate()
            .unwrap_err();
        assert!(matches!(err, FrameworkError::UnregisteredAction(_)));
        assert!(complete().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_duplicates() {
        let err = complete()
            .on(ActionTag::AwaitingTextForPdf, &[EventKind::Text], noop)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            FrameworkError::DuplicateHandler {
                tag: ActionTag::AwaitingTextForPdf,
                kind: EventKind::Text
            }
        ));
    }
}
