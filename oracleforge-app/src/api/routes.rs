use axum::async_trait;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use oracleforge_core::{
    paths, BlobStore, Card, CardDraft, CardService, Deck, DeckService, DocumentStore, ForgeError,
    Profile, ProfileService, TokenGrant,
};

use crate::api::dto::{
    decode_image, CardIn, CardOut, DeckCreateIn, DeckOut, DeckUpdateIn, ProfileIn, ProfileOut,
    TokenGrantOut,
};

pub struct AppState {
    pub docs: Arc<dyn DocumentStore>,
    pub decks: DeckService,
    pub cards: CardService,
    pub profiles: ProfileService,
}

impl AppState {
    pub fn new(docs: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            decks: DeckService::new(docs.clone(), blobs.clone()),
            cards: CardService::new(docs.clone(), blobs.clone()),
            profiles: ProfileService::new(docs.clone(), blobs),
            docs,
        }
    }
}

/// Caller identity, placed in `x-user-id` by the authenticating gateway
/// upstream. The services themselves never verify credentials.
pub struct Uid(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Uid
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.trim().is_empty())
            .map(|s| Uid(s.to_string()))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "missing x-user-id header" })),
                )
                    .into_response()
            })
    }
}

pub struct ApiError(ForgeError);

impl From<ForgeError> for ApiError {
    fn from(err: ForgeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ForgeError::Validation(_) | ForgeError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            ForgeError::NotFound(_) => StatusCode::NOT_FOUND,
            ForgeError::Storage(_) | ForgeError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn create_deck(
    State(st): State<Arc<AppState>>,
    Uid(uid): Uid,
    Json(body): Json<DeckCreateIn>,
) -> Result<(StatusCode, Json<DeckOut>), ApiError> {
    let image = decode_image(&body.card_back_image)?;
    let deck = st.decks.create_deck(&uid, &body.name, image.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(DeckOut::from_deck(&deck))))
}

pub async fn list_decks(
    State(st): State<Arc<AppState>>,
    Uid(uid): Uid,
) -> Result<Json<Vec<DeckOut>>, ApiError> {
    let mut decks = Vec::new();
    for (id, doc) in st.docs.list(&paths::decks_collection(&uid)).await? {
        let mut deck: Deck = serde_json::from_value(doc)
            .map_err(|e| ForgeError::Persistence(e.to_string()))?;
        deck.id = id;
        decks.push(deck);
    }
    decks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(Json(decks.iter().map(DeckOut::from_deck).collect()))
}

pub async fn update_deck(
    State(st): State<Arc<AppState>>,
    Uid(uid): Uid,
    Path(deck_id): Path<String>,
    Json(body): Json<DeckUpdateIn>,
) -> Result<StatusCode, ApiError> {
    let image = decode_image(&body.card_back_image)?;
    st.decks
        .update_deck(
            &uid,
            &deck_id,
            &body.name,
            image.as_ref(),
            body.old_image_url.as_deref(),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_deck(
    State(st): State<Arc<AppState>>,
    Uid(uid): Uid,
    Path(deck_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    st.decks.delete_deck(&uid, &deck_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_card(
    State(st): State<Arc<AppState>>,
    Uid(uid): Uid,
    Path(deck_id): Path<String>,
    Json(body): Json<CardIn>,
) -> Result<(StatusCode, Json<CardOut>), ApiError> {
    let image = decode_image(&body.image)?;
    let draft = CardDraft { name: body.name, meaning: body.meaning };
    let card = st.cards.add_card(&uid, &deck_id, draft, image.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(CardOut::from_card(&card))))
}

pub async fn list_cards(
    State(st): State<Arc<AppState>>,
    Uid(uid): Uid,
    Path(deck_id): Path<String>,
) -> Result<Json<Vec<CardOut>>, ApiError> {
    let mut cards = Vec::new();
    for (id, doc) in st.docs.list(&paths::cards_collection(&uid, &deck_id)).await? {
        let mut card: Card = serde_json::from_value(doc)
            .map_err(|e| ForgeError::Persistence(e.to_string()))?;
        card.id = id;
        cards.push(card);
    }
    cards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(Json(cards.iter().map(CardOut::from_card).collect()))
}

pub async fn update_card(
    State(st): State<Arc<AppState>>,
    Uid(uid): Uid,
    Path((deck_id, card_id)): Path<(String, String)>,
    Json(body): Json<CardIn>,
) -> Result<Json<CardOut>, ApiError> {
    let image = decode_image(&body.image)?;
    let draft = CardDraft { name: body.name, meaning: body.meaning };
    let card = st
        .cards
        .update_card(&uid, &deck_id, &card_id, draft, image.as_ref())
        .await?;
    Ok(Json(CardOut::from_card(&card)))
}

pub async fn delete_card(
    State(st): State<Arc<AppState>>,
    Uid(uid): Uid,
    Path((deck_id, card_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    st.cards.delete_card(&uid, &deck_id, &card_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_card_image(
    State(st): State<Arc<AppState>>,
    Uid(uid): Uid,
    Path((deck_id, card_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    st.cards.delete_card_image(&uid, &deck_id, &card_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_profile(
    State(st): State<Arc<AppState>>,
    Uid(uid): Uid,
) -> Result<Json<ProfileOut>, ApiError> {
    let doc = st
        .docs
        .get(&paths::user_doc(&uid))
        .await?
        .ok_or(ForgeError::NotFound("user profile"))?;
    let mut profile: Profile =
        serde_json::from_value(doc).map_err(|e| ForgeError::Persistence(e.to_string()))?;
    profile.uid = uid;
    Ok(Json(ProfileOut::from_profile(&profile)))
}

pub async fn update_profile(
    State(st): State<Arc<AppState>>,
    Uid(uid): Uid,
    Json(body): Json<ProfileIn>,
) -> Result<StatusCode, ApiError> {
    let avatar = decode_image(&body.avatar)?;
    st.profiles
        .update_profile(&uid, &body.username, avatar.as_ref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn grant_daily_token(
    State(st): State<Arc<AppState>>,
    Uid(uid): Uid,
) -> Result<Json<TokenGrantOut>, ApiError> {
    let out = match st.profiles.grant_daily_token(&uid).await? {
        TokenGrant::Granted { balance } => TokenGrantOut { granted: true, balance },
        TokenGrant::AlreadyClaimed { balance } => TokenGrantOut { granted: false, balance },
    };
    Ok(Json(out))
}
