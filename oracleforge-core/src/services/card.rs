use crate::services::{delete_blob_best_effort, from_doc, require, to_doc};
use crate::store::AtomicUpdate;
use crate::{paths, BlobStore, Card, CardDraft, DocumentStore, ForgeError, ImageData};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Card mutations own the deck's denormalized `cardCount`. Every counter
/// change goes through `run_atomic`; a plain read-then-write here is the
/// one guaranteed lost-update under concurrent adds and deletes.
pub struct CardService {
    docs: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

fn bump_card_count(delta: i64) -> AtomicUpdate {
    Box::new(move |doc| {
        let mut doc = doc.ok_or(ForgeError::NotFound("deck"))?;
        let obj = doc
            .as_object_mut()
            .ok_or_else(|| ForgeError::Persistence("deck document is not an object".into()))?;
        let current = obj.get("cardCount").and_then(Value::as_i64).unwrap_or(0);
        let next = current + delta;
        if next < 0 {
            // Underflow means the counter already drifted; suppress it
            // rather than propagate a negative count.
            tracing::warn!(current, delta, "card count underflow clamped to zero");
        }
        obj.insert("cardCount".into(), Value::from(next.max(0)));
        Ok(doc)
    })
}

impl CardService {
    pub fn new(docs: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { docs, blobs }
    }

    /// Face image is optional. The card id is allocated first to key the
    /// image path; the counter increment comes last, after the card
    /// document exists.
    pub async fn add_card(
        &self,
        owner: &str,
        deck_id: &str,
        draft: CardDraft,
        image: Option<&ImageData>,
    ) -> Result<Card, ForgeError> {
        require(owner, "user id")?;
        require(deck_id, "deck id")?;

        let deck_path = paths::deck_doc(owner, deck_id);
        if self.docs.get(&deck_path).await?.is_none() {
            return Err(ForgeError::NotFound("deck"));
        }

        let card_id = self.docs.allocate_id();
        let image_url = match image {
            Some(img) => Some(
                self.blobs
                    .upload(&paths::card_image_blob(owner, deck_id, &card_id), img)
                    .await?,
            ),
            None => None,
        };

        let mut card = Card::new(draft, image_url);
        card.id = card_id.clone();
        self.docs
            .set(&paths::card_doc(owner, deck_id, &card_id), to_doc(&card)?)
            .await?;

        self.docs.run_atomic(&deck_path, bump_card_count(1)).await?;
        Ok(card)
    }

    /// Field-level update: only fields present in the draft are written,
    /// and the id is a key, never a field. A replacement image deletes the
    /// old blob first (best-effort), then uploads under a fresh path.
    /// `cardCount` is untouched.
    pub async fn update_card(
        &self,
        owner: &str,
        deck_id: &str,
        card_id: &str,
        draft: CardDraft,
        new_image: Option<&ImageData>,
    ) -> Result<Card, ForgeError> {
        require(owner, "user id")?;
        require(deck_id, "deck id")?;
        require(card_id, "card id")?;

        let card_path = paths::card_doc(owner, deck_id, card_id);
        let existing = self
            .docs
            .get(&card_path)
            .await?
            .ok_or(ForgeError::NotFound("card"))?;
        let mut card: Card = from_doc(existing)?;
        card.id = card_id.to_string();

        let mut patch = Map::new();
        if let Some(name) = draft.name {
            patch.insert("name".into(), Value::String(name.clone()));
            card.name = name;
        }
        if let Some(meaning) = draft.meaning {
            patch.insert("meaning".into(), Value::String(meaning.clone()));
            card.meaning = meaning;
        }
        if let Some(img) = new_image {
            if let Some(old) = card.image_url.as_deref() {
                delete_blob_best_effort(self.blobs.as_ref(), old).await;
            }
            let path = paths::card_image_blob_versioned(
                owner,
                deck_id,
                card_id,
                Utc::now().timestamp_millis(),
            );
            let url = self.blobs.upload(&path, img).await?;
            patch.insert("imageUrl".into(), Value::String(url.clone()));
            card.image_url = Some(url);
        }

        self.docs.update(&card_path, Value::Object(patch)).await?;
        Ok(card)
    }

    /// Removes the card, its image blob (best-effort), and one unit of the
    /// parent's counter, clamped at zero.
    pub async fn delete_card(
        &self,
        owner: &str,
        deck_id: &str,
        card_id: &str,
    ) -> Result<(), ForgeError> {
        require(owner, "user id")?;
        require(deck_id, "deck id")?;
        require(card_id, "card id")?;

        let card_path = paths::card_doc(owner, deck_id, card_id);
        let doc = self
            .docs
            .get(&card_path)
            .await?
            .ok_or(ForgeError::NotFound("card"))?;

        if let Some(url) = doc.get("imageUrl").and_then(Value::as_str) {
            delete_blob_best_effort(self.blobs.as_ref(), url).await;
        }

        self.docs.delete(&card_path).await?;
        self.docs
            .run_atomic(&paths::deck_doc(owner, deck_id), bump_card_count(-1))
            .await?;
        Ok(())
    }

    /// Clears only the face image. No-op success when there is none; the
    /// blob store is not touched in that case.
    pub async fn delete_card_image(
        &self,
        owner: &str,
        deck_id: &str,
        card_id: &str,
    ) -> Result<(), ForgeError> {
        require(owner, "user id")?;
        require(deck_id, "deck id")?;
        require(card_id, "card id")?;

        let card_path = paths::card_doc(owner, deck_id, card_id);
        let doc = self
            .docs
            .get(&card_path)
            .await?
            .ok_or(ForgeError::NotFound("card"))?;

        let Some(url) = doc.get("imageUrl").and_then(Value::as_str) else {
            return Ok(());
        };
        delete_blob_best_effort(self.blobs.as_ref(), url).await;
        self.docs
            .update(&card_path, json!({ "imageUrl": Value::Null }))
            .await
    }
}
