//! The denormalized counter must match subcollection membership for any
//! interleaving of concurrent adds and deletes, and never go negative.

use oracleforge_core::{
    paths, CardDraft, CardService, DeckService, DocumentStore, ImageData, MemoryBlobs, MemoryDocs,
};
use std::sync::Arc;

async fn deck_with_services() -> (Arc<MemoryDocs>, Arc<CardService>, String) {
    let docs = Arc::new(MemoryDocs::new());
    let blobs = Arc::new(MemoryBlobs::new());
    let decks = DeckService::new(docs.clone(), blobs.clone());
    let cards = Arc::new(CardService::new(docs.clone(), blobs.clone()));
    let deck = decks
        .create_deck("u1", "Contended", Some(&ImageData::from_bytes("image/png", b"b".to_vec())))
        .await
        .unwrap();
    (docs, cards, deck.id)
}

async fn observed_state(docs: &MemoryDocs, deck_id: &str) -> (i64, usize) {
    let count = docs
        .get(&paths::deck_doc("u1", deck_id))
        .await
        .unwrap()
        .unwrap()["cardCount"]
        .as_i64()
        .unwrap();
    let live = docs
        .list(&paths::cards_collection("u1", deck_id))
        .await
        .unwrap()
        .len();
    (count, live)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_count_every_card() {
    let (docs, cards, deck_id) = deck_with_services().await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let cards = cards.clone();
        let deck_id = deck_id.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..5 {
                cards
                    .add_card("u1", &deck_id, CardDraft::default(), None)
                    .await
                    .unwrap();
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let (count, live) = observed_state(&docs, &deck_id).await;
    assert_eq!(count, 20);
    assert_eq!(live, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_adds_and_deletes_stay_consistent() {
    let (docs, cards, deck_id) = deck_with_services().await;

    let mut seeded = Vec::new();
    for _ in 0..10 {
        let card = cards
            .add_card("u1", &deck_id, CardDraft::default(), None)
            .await
            .unwrap();
        seeded.push(card.id);
    }

    let mut handles = Vec::new();
    for card_id in seeded {
        let cards = cards.clone();
        let deck_id = deck_id.clone();
        handles.push(tokio::spawn(async move {
            cards.delete_card("u1", &deck_id, &card_id).await.unwrap();
        }));
    }
    for _ in 0..6 {
        let cards = cards.clone();
        let deck_id = deck_id.clone();
        handles.push(tokio::spawn(async move {
            cards
                .add_card("u1", &deck_id, CardDraft::default(), None)
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let (count, live) = observed_state(&docs, &deck_id).await;
    assert_eq!(count, 6);
    assert_eq!(live, 6);
    assert!(count >= 0);
}
