//! State transitions and field-level updates.
//!
//! A handler never writes the store directly. It returns a [`Transition`],
//! and the engine commits it through [`StateStore::transact`], which applies
//! [`Transition::apply`] to the current document atomically. Accumulation is
//! expressed as [`FieldUpdate`]s evaluated against the document as it is at
//! commit time, so two interleaved appends both land.
//!
//! [`StateStore::transact`]: crate::store::StateStore::transact

use serde_json::{Map, Value};

use crate::action::ActionTag;
use crate::error::{StoreError, StoreResult};
use crate::ids::ChatId;
use crate::state::{Document, fields};

// =============================================================================
// Field updates
// =============================================================================

/// An operation on one (possibly nested) field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Overwrite the field.
    Set(Value),
    /// Remove the field. Removing a missing field is not an error.
    Delete,
    /// Append every value to an array field, creating it if missing.
    Append(Vec<Value>),
}

/// A field operation addressed by a dotted path (`api_keys.github`).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub path: String,
    pub op: FieldOp,
}

impl FieldUpdate {
    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            op: FieldOp::Set(value.into()),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            op: FieldOp::Delete,
        }
    }

    pub fn append(path: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            path: path.into(),
            op: FieldOp::Append(values),
        }
    }
}

/// Applies updates to a document in order.
///
/// Intermediate maps along a dotted path are created as needed. A path that
/// runs through a non-object value, or an append onto a non-array, fails
/// without modifying the document.
pub fn apply_updates(doc: &mut Document, updates: &[FieldUpdate]) -> StoreResult<()> {
    let mut staged = doc.clone();
    for update in updates {
        apply_one(&mut staged, update)?;
    }
    *doc = staged;
    Ok(())
}

fn apply_one(doc: &mut Document, update: &FieldUpdate) -> StoreResult<()> {
    let mut segments: Vec<&str> = update.path.split('.').collect();
    let leaf = match segments.pop() {
        Some(leaf) if !leaf.is_empty() => leaf,
        _ => return Err(StoreError::invalid_update(&update.path, "empty path")),
    };

    let mut current = doc;
    for segment in segments {
        if segment.is_empty() {
            return Err(StoreError::invalid_update(&update.path, "empty segment"));
        }
        if matches!(update.op, FieldOp::Delete) && !current.contains_key(segment) {
            return Ok(());
        }
        let next = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match next {
            Value::Object(map) => map,
            _ => {
                return Err(StoreError::invalid_update(
                    &update.path,
                    format!("'{segment}' is not an object"),
                ));
            }
        };
    }

    match &update.op {
        FieldOp::Set(value) => {
            current.insert(leaf.to_string(), value.clone());
        }
        FieldOp::Delete => {
            current.remove(leaf);
        }
        FieldOp::Append(values) => {
            let slot = current
                .entry(leaf.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            match slot {
                Value::Array(items) => items.extend(values.iter().cloned()),
                _ => {
                    return Err(StoreError::invalid_update(
                        &update.path,
                        "append target is not an array",
                    ));
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Transition
// =============================================================================

/// The outcome a handler requests for the chat's state.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Enter a new action. Prior scratch is discarded; credentials are kept.
    Replace { action: ActionTag, scratch: Document },
    /// Apply field updates while keeping the current action.
    Accumulate(Vec<FieldUpdate>),
    /// Operation finished or aborted. Only credentials survive; an otherwise
    /// empty record is deleted.
    Clear,
    /// Delete the whole record, credentials included.
    Discard,
    /// Leave the state untouched.
    NoChange,
}

impl Transition {
    /// Enters `action` with empty scratch.
    pub fn replace(action: ActionTag) -> Self {
        Self::Replace {
            action,
            scratch: Document::new(),
        }
    }

    /// Enters `action` with the given scratch fields.
    pub fn replace_with(action: ActionTag, scratch: Document) -> Self {
        Self::Replace { action, scratch }
    }

    /// Moves to the next wizard step, keeping scratch and applying `updates`.
    pub fn advance(next: ActionTag, mut updates: Vec<FieldUpdate>) -> Self {
        updates.push(FieldUpdate::set(fields::ACTION, next.as_str()));
        Self::Accumulate(updates)
    }

    /// Returns `true` if committing this transition touches the store.
    pub fn writes(&self) -> bool {
        !matches!(self, Self::NoChange)
    }

    /// Computes the post-transition document from the current one.
    ///
    /// `None` means the record should not exist afterwards.
    pub fn apply(&self, chat: ChatId, current: Option<Document>) -> StoreResult<Option<Document>> {
        match self {
            Self::NoChange => Ok(current),
            Self::Replace { action, scratch } => {
                let mut doc = retained(current.as_ref());
                for (key, value) in scratch {
                    if key != fields::ACTION {
                        doc.insert(key.clone(), value.clone());
                    }
                }
                doc.insert(
                    fields::ACTION.to_string(),
                    Value::String(action.as_str().to_string()),
                );
                Ok(Some(doc))
            }
            Self::Accumulate(updates) => {
                let mut doc = current.ok_or(StoreError::NotFound(chat))?;
                apply_updates(&mut doc, updates)?;
                Ok(Some(doc))
            }
            Self::Clear => {
                let doc = retained(current.as_ref());
                Ok(if doc.is_empty() { None } else { Some(doc) })
            }
            Self::Discard => Ok(None),
        }
    }
}

/// Copies the credential fields out of a document.
fn retained(doc: Option<&Document>) -> Document {
    let mut kept = Document::new();
    if let Some(doc) = doc {
        for field in fields::RETAINED {
            if let Some(value) = doc.get(*field) {
                kept.insert((*field).to_string(), value.clone());
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_dotted_set_and_delete() {
        let mut d = Document::new();
        apply_updates(&mut d, &[FieldUpdate::set("api_keys.github", "t1")]).unwrap();
        assert_eq!(Value::Object(d.clone()), json!({ "api_keys": { "github": "t1" } }));

        apply_updates(&mut d, &[FieldUpdate::delete("api_keys.github")]).unwrap();
        assert_eq!(Value::Object(d.clone()), json!({ "api_keys": {} }));

        // Deleting through a missing parent is a no-op.
        apply_updates(&mut d, &[FieldUpdate::delete("nope.deeper")]).unwrap();
        assert!(!d.contains_key("nope"));
    }

    #[test]
    fn test_append_creates_and_extends() {
        let mut d = Document::new();
        apply_updates(&mut d, &[FieldUpdate::append("images", vec![json!("a")])]).unwrap();
        apply_updates(&mut d, &[FieldUpdate::append("images", vec![json!("b")])]).unwrap();
        assert_eq!(d["images"], json!(["a", "b"]));
    }

    #[test]
    fn test_failed_update_leaves_document_untouched() {
        let mut d = doc(json!({ "format": "png" }));
        let err = apply_updates(
            &mut d,
            &[
                FieldUpdate::set("frameCount", 3),
                FieldUpdate::append("format", vec![json!("x")]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidUpdate { .. }));
        assert_eq!(Value::Object(d), json!({ "format": "png" }));
    }

    #[test]
    fn test_replace_discards_scratch_but_keeps_credentials() {
        let current = doc(json!({
            "action": "awaiting_frame_count",
            "frameCount": 4,
            "github_pat": "ghp",
        }));
        let next = Transition::replace(ActionTag::AwaitingTextForPdf)
            .apply(ChatId(1), Some(current))
            .unwrap()
            .unwrap();
        assert_eq!(
            Value::Object(next),
            json!({ "action": "awaiting_text_for_pdf", "github_pat": "ghp" })
        );
    }

    #[test]
    fn test_clear_deletes_record_without_credentials() {
        let current = doc(json!({ "action": "awaiting_text_for_pdf" }));
        assert_eq!(Transition::Clear.apply(ChatId(1), Some(current)).unwrap(), None);

        let with_keys = doc(json!({
            "action": "ai_chat_active",
            "chat_history": [],
            "api_keys": { "gemini": "k" }
        }));
        let kept = Transition::Clear.apply(ChatId(1), Some(with_keys)).unwrap();
        assert_eq!(
            kept.map(Value::Object),
            Some(json!({ "api_keys": { "gemini": "k" } }))
        );
    }

    #[test]
    fn test_discard_drops_credentials_too() {
        let current = doc(json!({
            "action": "awaiting_token",
            "github_pat": "ghp",
            "api_keys": { "openai": "sk" }
        }));
        assert_eq!(Transition::Discard.apply(ChatId(1), Some(current)).unwrap(), None);
        assert!(Transition::Discard.writes());
    }

    #[test]
    fn test_advance_keeps_collected_fields() {
        let current = doc(json!({ "action": "awaiting_deep_search_language", "query": "foo" }));
        let next = Transition::advance(ActionTag::AwaitingDeepSearchStars, Vec::new())
            .apply(ChatId(1), Some(current))
            .unwrap()
            .unwrap();
        assert_eq!(
            Value::Object(next),
            json!({ "action": "awaiting_deep_search_stars", "query": "foo" })
        );
    }

    #[test]
    fn test_accumulate_requires_record() {
        let err = Transition::Accumulate(vec![FieldUpdate::set("x", 1)])
            .apply(ChatId(9), None)
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
