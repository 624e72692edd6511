use chrono::{DateTime, Utc};
use oracleforge_core::{Card, Deck, ForgeError, ImageData, Profile};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct DeckCreateIn {
    pub name: String,
    /// data:image/...;base64 payload
    pub card_back_image: Option<String>,
}

#[derive(Deserialize)]
pub struct DeckUpdateIn {
    pub name: String,
    pub card_back_image: Option<String>,
    pub old_image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct CardIn {
    pub name: Option<String>,
    pub meaning: Option<String>,
    pub image: Option<String>,
}

#[derive(Deserialize)]
pub struct ProfileIn {
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Serialize)]
pub struct DeckOut {
    pub id: String,
    pub name: String,
    pub card_back_url: Option<String>,
    pub card_count: u32,
    pub created_at: DateTime<Utc>,
}

impl DeckOut {
    pub fn from_deck(deck: &Deck) -> Self {
        Self {
            id: deck.id.clone(),
            name: deck.name.clone(),
            card_back_url: deck.card_back_url().map(str::to_string),
            card_count: deck.card_count,
            created_at: deck.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct CardOut {
    pub id: String,
    pub name: String,
    pub meaning: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CardOut {
    pub fn from_card(card: &Card) -> Self {
        Self {
            id: card.id.clone(),
            name: card.name.clone(),
            meaning: card.meaning.clone(),
            image_url: card.image_url.clone(),
            created_at: card.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ProfileOut {
    pub username: String,
    pub avatar_url: Option<String>,
    pub token_balance: u32,
    pub last_login_claim: Option<DateTime<Utc>>,
}

impl ProfileOut {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            username: profile.username.clone(),
            avatar_url: profile.avatar_url.clone(),
            token_balance: profile.token_balance,
            last_login_claim: profile.last_login_claim,
        }
    }
}

#[derive(Serialize)]
pub struct TokenGrantOut {
    pub granted: bool,
    pub balance: u32,
}

/// Decode an optional data-URL image before anything touches a store.
pub fn decode_image(raw: &Option<String>) -> Result<Option<ImageData>, ForgeError> {
    raw.as_deref().map(ImageData::from_data_url).transpose()
}
