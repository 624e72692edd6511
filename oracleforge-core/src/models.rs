use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type DeckId = String;
pub type CardId = String;
pub type UserId = String;

pub const DEFAULT_CARD_NAME: &str = "Untitled Card";

/// A named collection of cards with a shared back image.
///
/// `card_back` and `card_backing_url` are two historical names for the same
/// URL; both are written on every change and reads prefer the newer one.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    /// Document key, never stored inside the document body.
    #[serde(skip)]
    pub id: DeckId,
    pub name: String,
    #[serde(default)]
    pub card_back: Option<String>,
    #[serde(default)]
    pub card_backing_url: Option<String>,
    #[serde(default)]
    pub card_count: u32,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
}

impl Deck {
    pub fn new(user_id: impl Into<UserId>, name: impl Into<String>, card_back_url: impl Into<String>) -> Self {
        let url = card_back_url.into();
        Self {
            id: DeckId::new(),
            name: name.into(),
            card_back: Some(url.clone()),
            card_backing_url: Some(url),
            card_count: 0,
            created_at: Utc::now(),
            user_id: user_id.into(),
        }
    }

    pub fn card_back_url(&self) -> Option<&str> {
        self.card_backing_url.as_deref().or(self.card_back.as_deref())
    }

    pub fn set_card_back_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        self.card_back = Some(url.clone());
        self.card_backing_url = Some(url);
    }
}

/// An illustrated unit within a deck. The face image is optional.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(skip)]
    pub id: CardId,
    pub name: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Card {
    pub fn new(draft: CardDraft, image_url: Option<String>) -> Self {
        let name = match draft.name {
            Some(n) if !n.trim().is_empty() => n,
            _ => DEFAULT_CARD_NAME.to_string(),
        };
        Self {
            id: CardId::new(),
            name,
            meaning: draft.meaning.unwrap_or_default(),
            image_url,
            created_at: Utc::now(),
        }
    }
}

/// User-supplied card fields. Absent fields are left untouched on update
/// and filled with defaults on creation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(skip)]
    pub uid: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub token_balance: u32,
    #[serde(default)]
    pub last_login_claim: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn new(uid: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            username: username.into(),
            avatar_url: None,
            token_balance: 0,
            last_login_claim: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deck_doc_keeps_url_aliases_in_sync() {
        let mut deck = Deck::new("u1", "Major Arcana", "https://blobs/o/a");
        deck.set_card_back_url("https://blobs/o/b");
        let doc = serde_json::to_value(&deck).unwrap();
        assert_eq!(doc["cardBack"], doc["cardBackingUrl"]);
        assert_eq!(doc["cardCount"], 0);
        assert_eq!(doc["userId"], "u1");
        assert!(doc.get("id").is_none());
    }

    #[test]
    fn card_defaults_apply_on_blank_draft() {
        let card = Card::new(
            CardDraft { name: Some("   ".into()), meaning: None },
            None,
        );
        assert_eq!(card.name, DEFAULT_CARD_NAME);
        assert_eq!(card.meaning, "");
        assert!(card.image_url.is_none());
    }

    #[test]
    fn profile_parses_partial_document() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "username": "madame-sosostris"
        }))
        .unwrap();
        assert_eq!(profile.token_balance, 0);
        assert!(profile.last_login_claim.is_none());
    }
}
