//! Document and blob path conventions shared by every service.
//!
//! Documents: `users/{uid}` profiles, `users/{uid}/decks/{deckId}` decks,
//! `users/{uid}/decks/{deckId}/cards/{cardId}` cards. Blobs live under the
//! same prefix with the card-back/card/avatar names below.

pub fn user_doc(uid: &str) -> String {
    format!("users/{uid}")
}

pub fn decks_collection(uid: &str) -> String {
    format!("users/{uid}/decks")
}

pub fn deck_doc(uid: &str, deck_id: &str) -> String {
    format!("users/{uid}/decks/{deck_id}")
}

pub fn cards_collection(uid: &str, deck_id: &str) -> String {
    format!("users/{uid}/decks/{deck_id}/cards")
}

pub fn card_doc(uid: &str, deck_id: &str, card_id: &str) -> String {
    format!("users/{uid}/decks/{deck_id}/cards/{card_id}")
}

pub fn card_back_blob(uid: &str, deck_id: &str) -> String {
    format!("users/{uid}/decks/{deck_id}/card-back")
}

/// Replacement card backs get a fresh path so readers of the old blob are
/// never raced by an overwrite-in-place.
pub fn card_back_blob_versioned(uid: &str, deck_id: &str, millis: i64) -> String {
    format!("users/{uid}/decks/{deck_id}/card-back-{millis}")
}

pub fn card_image_blob(uid: &str, deck_id: &str, card_id: &str) -> String {
    format!("users/{uid}/decks/{deck_id}/cards/{card_id}")
}

pub fn card_image_blob_versioned(uid: &str, deck_id: &str, card_id: &str, millis: i64) -> String {
    format!("users/{uid}/decks/{deck_id}/cards/{card_id}-{millis}")
}

/// Avatars have no old-version retention requirement; one fixed path,
/// overwritten in place.
pub fn avatar_blob(uid: &str) -> String {
    format!("users/{uid}/avatar/avatar.jpg")
}
