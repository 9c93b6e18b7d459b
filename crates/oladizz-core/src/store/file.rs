use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::trace;

use super::{Mutation, StateStore};
use crate::error::{StoreError, StoreResult};
use crate::ids::ChatId;
use crate::state::Document;

/// Durable store keeping one `<chat>.json` file per chat.
///
/// Writes go to a temporary sibling and are renamed into place. Each chat has
/// its own async lock, so transactions on different chats never wait on each
/// other while transactions on the same chat are serialized.
#[derive(Debug)]
pub struct FileStateStore {
    dir: PathBuf,
    locks: Mutex<HashMap<ChatId, Arc<AsyncMutex<()>>>>,
}

impl FileStateStore {
    /// Opens (and creates, if needed) a store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, chat: ChatId) -> PathBuf {
        self.dir.join(format!("{chat}.json"))
    }

    fn lock_for(&self, chat: ChatId) -> Arc<AsyncMutex<()>> {
        self.locks.lock().entry(chat).or_default().clone()
    }

    /// Drops the chat's lock once it has no record and no other holder.
    fn release(&self, chat: ChatId, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self.locks.lock();
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&chat);
        }
    }

    async fn read(&self, chat: ChatId) -> StoreResult<Option<Document>> {
        let path = self.path_for(chat);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice::<Document>(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                chat,
                reason: e.to_string(),
            })
    }

    /// Read, mutate and write back; the caller holds the chat's lock.
    async fn apply(&self, chat: ChatId, mutation: Mutation) -> StoreResult<Option<Document>> {
        let current = self.read(chat).await?;
        let next = mutation(current)?;
        self.write(chat, next.as_ref()).await?;
        Ok(next)
    }

    async fn write(&self, chat: ChatId, doc: Option<&Document>) -> StoreResult<()> {
        let path = self.path_for(chat);
        match doc {
            Some(doc) => {
                let bytes =
                    serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Io(e.to_string()))?;
                let tmp = path.with_extension("json.tmp");
                tokio::fs::write(&tmp, bytes).await?;
                tokio::fs::rename(&tmp, &path).await?;
                trace!(chat = %chat, path = %path.display(), "State record written");
            }
            None => match tokio::fs::remove_file(&path).await {
                Ok(()) => trace!(chat = %chat, "State record removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, chat: ChatId) -> StoreResult<Option<Document>> {
        let lock = self.lock_for(chat);
        let result = {
            let _guard = lock.lock().await;
            self.read(chat).await
        };
        if matches!(result, Ok(None)) {
            self.release(chat, lock);
        }
        result
    }

    async fn transact(&self, chat: ChatId, mutation: Mutation) -> StoreResult<Option<Document>> {
        let lock = self.lock_for(chat);
        let result = {
            let _guard = lock.lock().await;
            self.apply(chat, mutation).await
        };
        if matches!(result, Ok(None)) {
            self.release(chat, lock);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let chat = ChatId(-100123);
        {
            let store = FileStateStore::open(dir.path()).await.unwrap();
            let mut doc = Document::new();
            doc.insert("github_pat".into(), json!("ghp_x"));
            store.set_merge(chat, doc).await.unwrap();
        }
        let store = FileStateStore::open(dir.path()).await.unwrap();
        let doc = store.get(chat).await.unwrap().unwrap();
        assert_eq!(doc["github_pat"], json!("ghp_x"));
        assert!(dir.path().join("-100123.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("5.json"), b"not json")
            .await
            .unwrap();
        let store = FileStateStore::open(dir.path()).await.unwrap();
        let err = store.get(ChatId(5)).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_deleted_chat_releases_its_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).await.unwrap();
        let chat = ChatId(8);
        let doc = json!({ "action": "awaiting_text_for_pdf" });
        store
            .set_merge(chat, doc.as_object().cloned().unwrap())
            .await
            .unwrap();
        assert_eq!(store.locks.lock().len(), 1);

        store.delete(chat).await.unwrap();
        assert!(store.locks.lock().is_empty());

        assert!(store.get(ChatId(9)).await.unwrap().is_none());
        assert!(store.locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).await.unwrap();
        let chat = ChatId(3);
        let result = store
            .transact(chat, Box::new(|_| Err(StoreError::Io("boom".into()))))
            .await;
        assert!(result.is_err());
        assert!(store.get(chat).await.unwrap().is_none());
    }
}
