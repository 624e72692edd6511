use oracleforge_core::store::DocumentStore;
use oracleforge_core::{BlobStore, ForgeError, ImageData};
use oracleforge_fs::{FsBlobStore, FsDocumentStore};
use serde_json::json;
use tempfile::tempdir;

async fn open_store(dir: &std::path::Path) -> FsDocumentStore {
    FsDocumentStore::open_with(dir.join("documents.json"), dir.join("backups"), 3)
        .await
        .unwrap()
}

#[tokio::test]
async fn documents_survive_reopen() {
    let dir = tempdir().unwrap();

    let store = open_store(dir.path()).await;
    store
        .set("users/u1/decks/d1", json!({"name": "Arcana", "cardCount": 2}))
        .await
        .unwrap();
    store.set("users/u1", json!({"username": "q"})).await.unwrap();
    drop(store);

    let reopened = open_store(dir.path()).await;
    let deck = reopened.get("users/u1/decks/d1").await.unwrap().unwrap();
    assert_eq!(deck["name"], "Arcana");
    assert_eq!(deck["cardCount"], 2);
    assert!(reopened.get("users/u2").await.unwrap().is_none());
}

#[tokio::test]
async fn update_merges_and_requires_existing() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path()).await;

    store.set("users/u1", json!({"username": "a", "tokenBalance": 1})).await.unwrap();
    store.update("users/u1", json!({"tokenBalance": 2})).await.unwrap();

    let doc = store.get("users/u1").await.unwrap().unwrap();
    assert_eq!(doc["username"], "a");
    assert_eq!(doc["tokenBalance"], 2);

    let err = store.update("users/ghost", json!({"x": 1})).await.unwrap_err();
    assert!(matches!(err, ForgeError::NotFound(_)));
}

#[tokio::test]
async fn list_returns_immediate_children_only() {
    let dir = tempdir().unwrap();
    let store = open_store(dir.path()).await;

    store.set("users/u1/decks/d1", json!({"name": "a"})).await.unwrap();
    store.set("users/u1/decks/d1/cards/c1", json!({"name": "b"})).await.unwrap();

    let listed = store.list("users/u1/decks").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].0, "d1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn run_atomic_increments_are_not_lost() {
    let dir = tempdir().unwrap();
    let store = std::sync::Arc::new(open_store(dir.path()).await);
    store.set("users/u1/decks/d1", json!({"cardCount": 0})).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .run_atomic(
                    "users/u1/decks/d1",
                    Box::new(|doc| {
                        let mut doc = doc.unwrap();
                        let n = doc["cardCount"].as_i64().unwrap();
                        doc["cardCount"] = (n + 1).into();
                        Ok(doc)
                    }),
                )
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let doc = store.get("users/u1/decks/d1").await.unwrap().unwrap();
    assert_eq!(doc["cardCount"], 16);
}

#[tokio::test]
async fn blobs_round_trip_and_delete_best_effort() {
    let dir = tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path().join("blobs"));

    let img = ImageData::from_bytes("image/png", b"pixels".to_vec());
    let url = blobs.upload("users/u1/decks/d1/card-back", &img).await.unwrap();

    let (mime, bytes) = blobs.blob_by_url(&url).unwrap();
    assert_eq!(mime, "image/png");
    assert_eq!(bytes, b"pixels");

    blobs.delete(&url).await.unwrap();
    assert!(blobs.blob_by_url(&url).is_none());
    // Deleting again (and junk URLs) stays quiet.
    blobs.delete(&url).await.unwrap();
    blobs.delete("junk").await.unwrap();
}
