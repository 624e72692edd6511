use crate::store::{blob_url, AtomicUpdate, BlobStore, DocumentStore};
use crate::{ForgeError, ImageData};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

const MEMORY_BLOB_BASE: &str = "https://blobs.invalid";

/// In-memory document store for tests and the dev server. One mutex over
/// the whole map keeps `run_atomic` trivially serialized.
#[derive(Default)]
pub struct MemoryDocs {
    docs: Mutex<HashMap<String, Value>>,
}

impl MemoryDocs {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocs {
    fn allocate_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    async fn set(&self, path: &str, doc: Value) -> Result<(), ForgeError> {
        if !doc.is_object() {
            return Err(ForgeError::Persistence("document must be a JSON object".into()));
        }
        self.docs.lock().insert(path.to_string(), doc);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Value>, ForgeError> {
        Ok(self.docs.lock().get(path).cloned())
    }

    async fn update(&self, path: &str, patch: Value) -> Result<(), ForgeError> {
        let Value::Object(patch) = patch else {
            return Err(ForgeError::Persistence("patch must be a JSON object".into()));
        };
        let mut docs = self.docs.lock();
        let doc = docs
            .get_mut(path)
            .ok_or(ForgeError::NotFound("document"))?;
        let obj = doc
            .as_object_mut()
            .ok_or_else(|| ForgeError::Persistence("stored document is not an object".into()))?;
        for (k, v) in patch {
            obj.insert(k, v);
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), ForgeError> {
        self.docs.lock().remove(path);
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, ForgeError> {
        let prefix = format!("{collection}/");
        let docs = self.docs.lock();
        Ok(docs
            .iter()
            .filter_map(|(path, doc)| {
                let id = path.strip_prefix(&prefix)?;
                if id.is_empty() || id.contains('/') {
                    return None;
                }
                Some((id.to_string(), doc.clone()))
            })
            .collect())
    }

    async fn run_atomic(&self, path: &str, apply: AtomicUpdate) -> Result<Value, ForgeError> {
        let mut docs = self.docs.lock();
        let current = docs.get(path).cloned();
        let next = apply(current)?;
        if !next.is_object() {
            return Err(ForgeError::Persistence("document must be a JSON object".into()));
        }
        docs.insert(path.to_string(), next.clone());
        Ok(next)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub struct MemoryBlobs {
    blobs: Mutex<HashMap<String, StoredBlob>>,
}

impl MemoryBlobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob_at(&self, path: &str) -> Option<StoredBlob> {
        self.blobs.lock().get(path).cloned()
    }

    pub fn blob_by_url(&self, url: &str) -> Option<StoredBlob> {
        let path = blob_url::to_path(url)?;
        self.blob_at(path)
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn upload(&self, path: &str, image: &ImageData) -> Result<String, ForgeError> {
        let blob = StoredBlob {
            content_type: image.content_type.clone(),
            bytes: image.bytes.clone(),
        };
        self.blobs.lock().insert(path.to_string(), blob);
        Ok(blob_url::for_path(MEMORY_BLOB_BASE, path))
    }

    async fn delete(&self, url: &str) -> Result<(), ForgeError> {
        let Some(path) = blob_url::to_path(url) else {
            tracing::warn!(url, "blob delete skipped, unparseable url");
            return Ok(());
        };
        if self.blobs.lock().remove(path).is_none() {
            tracing::debug!(path, "blob delete skipped, already absent");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn list_returns_immediate_children_only() {
        let docs = MemoryDocs::new();
        docs.set("users/u1/decks/d1", json!({"name": "a"})).await.unwrap();
        docs.set("users/u1/decks/d2", json!({"name": "b"})).await.unwrap();
        docs.set("users/u1/decks/d1/cards/c1", json!({"name": "c"})).await.unwrap();

        let mut ids: Vec<String> = docs
            .list("users/u1/decks")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        assert_eq!(ids, ["d1", "d2"]);
    }

    #[tokio::test]
    async fn update_requires_existing_document() {
        let docs = MemoryDocs::new();
        let err = docs.update("users/u1", json!({"username": "x"})).await.unwrap_err();
        assert!(matches!(err, ForgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn blob_delete_swallows_missing() {
        let blobs = MemoryBlobs::new();
        blobs
            .delete("https://blobs.invalid/o/users/u1/avatar/avatar.jpg")
            .await
            .unwrap();
        blobs.delete("garbage").await.unwrap();
    }
}
