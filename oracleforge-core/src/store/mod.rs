use crate::{ForgeError, ImageData};
use async_trait::async_trait;
use serde_json::Value;

pub mod memory;

pub use memory::{MemoryBlobs, MemoryDocs, StoredBlob};

/// Read-modify-write step handed to [`DocumentStore::run_atomic`]. Receives
/// the current document (if any) and returns the full replacement value.
pub type AtomicUpdate = Box<dyn FnOnce(Option<Value>) -> Result<Value, ForgeError> + Send>;

/// Document database gateway. Documents are JSON objects addressed by
/// slash-separated paths; the store is the single source of truth.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Allocate a fresh document id without writing anything. Callers use
    /// it to key blob paths before the document exists.
    fn allocate_id(&self) -> String;

    /// Create or overwrite the whole document at `path`.
    async fn set(&self, path: &str, doc: Value) -> Result<(), ForgeError>;

    async fn get(&self, path: &str) -> Result<Option<Value>, ForgeError>;

    /// Merge `patch`'s fields into an existing document. `NotFound` if the
    /// document is absent.
    async fn update(&self, path: &str, patch: Value) -> Result<(), ForgeError>;

    /// Delete the document at `path`. Deleting an absent document is not an
    /// error.
    async fn delete(&self, path: &str) -> Result<(), ForgeError>;

    /// Immediate child documents of `collection`, as `(id, doc)` pairs.
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, ForgeError>;

    /// Atomic read-modify-write of one document, serialized against other
    /// `run_atomic` calls on the same path. Does not span documents.
    /// Returns the committed value.
    async fn run_atomic(&self, path: &str, apply: AtomicUpdate) -> Result<Value, ForgeError>;
}

/// Object storage gateway. Blobs are non-authoritative: documents hold the
/// only strong reference, by URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `image` at `path`, overwriting any blob already there, and
    /// return an effectively-permanent retrieval URL.
    async fn upload(&self, path: &str, image: &ImageData) -> Result<String, ForgeError>;

    /// Delete the blob the URL points at. Best-effort by contract: a
    /// missing blob or an unparseable URL is logged and swallowed, since
    /// the triggering document mutation has typically already committed.
    async fn delete(&self, url: &str) -> Result<(), ForgeError>;
}

/// Retrieval URLs embed the storage path after an `/o/` marker, the same
/// shape both store implementations produce and parse.
pub mod blob_url {
    pub fn for_path(base: &str, path: &str) -> String {
        format!("{base}/o/{path}")
    }

    pub fn to_path(url: &str) -> Option<&str> {
        let (_, rest) = url.split_once("/o/")?;
        let path = rest.split('?').next().unwrap_or(rest);
        (!path.is_empty()).then_some(path)
    }
}
