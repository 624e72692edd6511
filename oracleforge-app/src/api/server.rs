use axum::routing::{delete, get, post, put};
use axum::Router;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::api::routes::{
    add_card, create_deck, delete_card, delete_card_image, delete_deck, get_profile,
    grant_daily_token, list_cards, list_decks, update_card, update_deck, update_profile, AppState,
};

pub async fn run(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/decks", post(create_deck).get(list_decks))
        .route("/decks/:deck_id", put(update_deck).delete(delete_deck))
        .route("/decks/:deck_id/cards", post(add_card).get(list_cards))
        .route(
            "/decks/:deck_id/cards/:card_id",
            put(update_card).delete(delete_card),
        )
        .route("/decks/:deck_id/cards/:card_id/image", delete(delete_card_image))
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile/daily-token", post(grant_daily_token))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "oracleforge listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
