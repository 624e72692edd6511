use crate::services::{delete_blob_best_effort, from_doc, require, to_doc};
use crate::{paths, BlobStore, Deck, DocumentStore, ForgeError, ImageData};
use chrono::Utc;
use futures_util::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;

/// Deck lifecycle: absent -> active -> deleted. Renaming and re-imaging
/// keep a deck active; delete cascades over cards and blobs.
pub struct DeckService {
    docs: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

impl DeckService {
    pub fn new(docs: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { docs, blobs }
    }

    /// A card-back image is mandatory at creation, unlike card face images.
    /// The id is allocated up front so the blob path can be keyed by it;
    /// if the upload fails the document is never written.
    pub async fn create_deck(
        &self,
        owner: &str,
        name: &str,
        card_back: Option<&ImageData>,
    ) -> Result<Deck, ForgeError> {
        require(owner, "user id")?;
        require(name, "deck name")?;
        let image = card_back
            .ok_or_else(|| ForgeError::Validation("a card back image is required".into()))?;

        let deck_id = self.docs.allocate_id();
        let url = self
            .blobs
            .upload(&paths::card_back_blob(owner, &deck_id), image)
            .await?;

        let mut deck = Deck::new(owner, name.trim(), url);
        deck.id = deck_id.clone();
        // A write failure past this point leaks the uploaded blob; the
        // document stays absent, which is the side we must keep clean.
        self.docs
            .set(&paths::deck_doc(owner, &deck_id), to_doc(&deck)?)
            .await?;
        Ok(deck)
    }

    /// Always renames; optionally swaps the card back. Strict order when a
    /// new image is supplied: upload the new blob under a fresh path,
    /// commit the document, and only then delete the old blob. A deck must
    /// never point at a blob that is already gone.
    pub async fn update_deck(
        &self,
        owner: &str,
        deck_id: &str,
        name: &str,
        new_card_back: Option<&ImageData>,
        old_image_url: Option<&str>,
    ) -> Result<(), ForgeError> {
        require(owner, "user id")?;
        require(deck_id, "deck id")?;
        require(name, "deck name")?;

        let mut patch = json!({ "name": name.trim() });
        let mut replaced = false;
        if let Some(image) = new_card_back {
            let path = paths::card_back_blob_versioned(
                owner,
                deck_id,
                Utc::now().timestamp_millis(),
            );
            let url = self.blobs.upload(&path, image).await?;
            patch["cardBack"] = Value::String(url.clone());
            patch["cardBackingUrl"] = Value::String(url);
            replaced = true;
        }

        self.docs
            .update(&paths::deck_doc(owner, deck_id), patch)
            .await?;

        if replaced {
            if let Some(old) = old_image_url {
                delete_blob_best_effort(self.blobs.as_ref(), old).await;
            }
        }
        Ok(())
    }

    /// Cascading delete. Blobs are attempted before their documents go
    /// away: an orphan blob is a storage leak, a document pointing at a
    /// gone blob is a broken-image state, and the leak is the lesser
    /// failure mode.
    pub async fn delete_deck(&self, owner: &str, deck_id: &str) -> Result<(), ForgeError> {
        require(owner, "user id")?;
        require(deck_id, "deck id")?;

        let deck_path = paths::deck_doc(owner, deck_id);
        let deck_doc = self
            .docs
            .get(&deck_path)
            .await?
            .ok_or(ForgeError::NotFound("deck"))?;
        let deck: Deck = from_doc(deck_doc)?;

        let cards = self
            .docs
            .list(&paths::cards_collection(owner, deck_id))
            .await?;

        // Every card image is attempted even if some fail.
        let deletes: Vec<_> = cards
            .iter()
            .filter_map(|(_, doc)| doc.get("imageUrl").and_then(Value::as_str))
            .map(|url| delete_blob_best_effort(self.blobs.as_ref(), url))
            .collect();
        join_all(deletes).await;

        for (card_id, _) in &cards {
            self.docs
                .delete(&paths::card_doc(owner, deck_id, card_id))
                .await?;
        }

        if let Some(url) = deck.card_back_url() {
            delete_blob_best_effort(self.blobs.as_ref(), url).await;
        }

        self.docs.delete(&deck_path).await
    }
}
