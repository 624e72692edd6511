//! Mutation services. Each operation is triggered by one external request
//! and talks to the blob store (0+ times) then the document store (1+
//! times) in a fixed order; nothing here calls back out or runs in the
//! background. The document store is authoritative, blobs are not, so blob
//! cleanup after a committed write is always best-effort.

use crate::{BlobStore, ForgeError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

mod card;
mod deck;
mod profile;

pub use card::CardService;
pub use deck::DeckService;
pub use profile::{ProfileService, TokenGrant};

/// Issue a blob delete whose failure must not fail the surrounding
/// operation. Logged and swallowed.
pub(crate) async fn delete_blob_best_effort(blobs: &dyn BlobStore, url: &str) {
    if let Err(err) = blobs.delete(url).await {
        tracing::warn!(url, error = %err, "best-effort blob delete failed");
    }
}

pub(crate) fn to_doc<T: Serialize>(value: &T) -> Result<Value, ForgeError> {
    serde_json::to_value(value).map_err(|e| ForgeError::Persistence(e.to_string()))
}

pub(crate) fn from_doc<T: DeserializeOwned>(doc: Value) -> Result<T, ForgeError> {
    serde_json::from_value(doc).map_err(|e| ForgeError::Persistence(e.to_string()))
}

pub(crate) fn require(value: &str, what: &str) -> Result<(), ForgeError> {
    if value.trim().is_empty() {
        return Err(ForgeError::Validation(format!("{what} is required")));
    }
    Ok(())
}
