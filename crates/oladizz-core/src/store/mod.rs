//! State store abstraction.
//!
//! A [`StateStore`] maps a chat to one JSON document. Implementations only
//! provide [`get`](StateStore::get) and an atomic read-modify-write
//! ([`transact`](StateStore::transact)); the field-level operations are
//! derived from it, so every write goes through one atomic path.
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`MemoryStateStore`] | Tests and ephemeral deployments |
//! | [`FileStateStore`] | One JSON file per chat under a data directory |

mod file;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::ids::ChatId;
use crate::state::Document;
use crate::transition::{FieldUpdate, apply_updates};

pub use file::FileStateStore;
pub use memory::MemoryStateStore;

/// A mutation applied atomically to one chat's record.
///
/// Receives the current document (or `None`) and returns the document to
/// store (or `None` to delete the record). Returning an error aborts the
/// write.
pub type Mutation = Box<dyn FnOnce(Option<Document>) -> StoreResult<Option<Document>> + Send>;

/// A type-erased state store.
pub type BoxedStateStore = Arc<dyn StateStore>;

/// Keyed document store holding one state record per chat.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the record for `chat`.
    async fn get(&self, chat: ChatId) -> StoreResult<Option<Document>>;

    /// Atomically replaces the record with the result of `mutation`.
    ///
    /// Returns the stored post-image.
    async fn transact(&self, chat: ChatId, mutation: Mutation) -> StoreResult<Option<Document>>;

    /// Merges top-level fields into the record, creating it if absent.
    async fn set_merge(&self, chat: ChatId, partial: Document) -> StoreResult<()> {
        self.transact(
            chat,
            Box::new(move |current| {
                let mut doc = current.unwrap_or_default();
                doc.extend(partial);
                Ok(Some(doc))
            }),
        )
        .await
        .map(|_| ())
    }

    /// Applies field updates to an existing record.
    ///
    /// Fails with [`StoreError::NotFound`] if there is no record.
    async fn update_fields(&self, chat: ChatId, updates: Vec<FieldUpdate>) -> StoreResult<Document> {
        self.transact(
            chat,
            Box::new(move |current| {
                let mut doc = current.ok_or(StoreError::NotFound(chat))?;
                apply_updates(&mut doc, &updates)?;
                Ok(Some(doc))
            }),
        )
        .await?
        .ok_or(StoreError::NotFound(chat))
    }

    /// Atomically appends `values` to the array at `field`.
    ///
    /// Returns the array length after the append.
    async fn append_to_field(
        &self,
        chat: ChatId,
        field: &str,
        values: Vec<Value>,
    ) -> StoreResult<usize> {
        let doc = self
            .update_fields(chat, vec![FieldUpdate::append(field, values)])
            .await?;
        Ok(doc
            .get(field)
            .and_then(Value::as_array)
            .map_or(0, Vec::len))
    }

    /// Deletes the record. Deleting a missing record succeeds.
    async fn delete(&self, chat: ChatId) -> StoreResult<()> {
        self.transact(chat, Box::new(|_| Ok(None))).await.map(|_| ())
    }
}
