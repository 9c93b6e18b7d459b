use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Mutation, StateStore};
use crate::error::StoreResult;
use crate::ids::ChatId;
use crate::state::Document;

/// In-process store backed by a mutex-guarded map.
///
/// Mutations run while the lock is held, so each `transact` is atomic with
/// respect to every other call on the same store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: Mutex<HashMap<ChatId, Document>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, chat: ChatId) -> StoreResult<Option<Document>> {
        Ok(self.records.lock().get(&chat).cloned())
    }

    async fn transact(&self, chat: ChatId, mutation: Mutation) -> StoreResult<Option<Document>> {
        let mut records = self.records.lock();
        let next = mutation(records.get(&chat).cloned())?;
        match &next {
            Some(doc) => {
                records.insert(chat, doc.clone());
            }
            None => {
                records.remove(&chat);
            }
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let store = Arc::new(MemoryStateStore::new());
        let chat = ChatId(1);
        let mut doc = Document::new();
        doc.insert("images".into(), json!([]));
        store.set_merge(chat, doc).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .append_to_field(chat, "images", vec![json!(format!("img-{i}"))])
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = store.get(chat).await.unwrap().unwrap();
        assert_eq!(stored["images"].as_array().map(Vec::len), Some(32));
    }
}
