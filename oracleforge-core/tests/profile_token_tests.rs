use chrono::{Duration, Utc};
use oracleforge_core::{
    paths, DocumentStore, ForgeError, ImageData, MemoryBlobs, MemoryDocs, Profile, ProfileService,
    TokenGrant,
};
use serde_json::json;
use std::sync::Arc;

fn service() -> (Arc<MemoryDocs>, Arc<MemoryBlobs>, ProfileService) {
    let docs = Arc::new(MemoryDocs::new());
    let blobs = Arc::new(MemoryBlobs::new());
    let profiles = ProfileService::new(docs.clone(), blobs.clone());
    (docs, blobs, profiles)
}

async fn seed_profile(docs: &MemoryDocs, uid: &str) {
    let profile = Profile::new(uid, "querent");
    docs.set(&paths::user_doc(uid), serde_json::to_value(&profile).unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn grant_twice_same_day_increments_once() {
    let (docs, _, profiles) = service();
    seed_profile(&docs, "u1").await;

    let first = profiles.grant_daily_token("u1").await.unwrap();
    assert_eq!(first, TokenGrant::Granted { balance: 1 });

    let second = profiles.grant_daily_token("u1").await.unwrap();
    assert_eq!(second, TokenGrant::AlreadyClaimed { balance: 1 });
}

#[tokio::test]
async fn grant_next_day_increments_again() {
    let (docs, _, profiles) = service();
    seed_profile(&docs, "u1").await;

    let yesterday = Utc::now() - Duration::days(1);
    docs.update(
        &paths::user_doc("u1"),
        json!({ "tokenBalance": 3, "lastLoginClaim": yesterday }),
    )
    .await
    .unwrap();

    let grant = profiles.grant_daily_token("u1").await.unwrap();
    assert_eq!(grant, TokenGrant::Granted { balance: 4 });
}

#[tokio::test]
async fn grant_without_profile_is_not_found() {
    let (_, _, profiles) = service();
    let err = profiles.grant_daily_token("ghost").await.unwrap_err();
    assert!(matches!(err, ForgeError::NotFound(_)));
}

#[tokio::test]
async fn update_profile_writes_username_and_avatar() {
    let (docs, blobs, profiles) = service();
    seed_profile(&docs, "u1").await;

    profiles
        .update_profile("u1", "madame-sosostris", Some(&ImageData::from_bytes("image/jpeg", b"v1".to_vec())))
        .await
        .unwrap();
    // Re-upload overwrites in place: still exactly one avatar blob.
    profiles
        .update_profile("u1", "madame-sosostris", Some(&ImageData::from_bytes("image/jpeg", b"v2".to_vec())))
        .await
        .unwrap();

    assert_eq!(blobs.blob_count(), 1);
    assert_eq!(blobs.blob_at(&paths::avatar_blob("u1")).unwrap().bytes, b"v2");

    let stored = docs.get(&paths::user_doc("u1")).await.unwrap().unwrap();
    assert_eq!(stored["username"], "madame-sosostris");
    assert!(stored["avatarUrl"].as_str().unwrap().contains("avatar.jpg"));
}

#[tokio::test]
async fn update_profile_without_document_is_not_found() {
    let (_, _, profiles) = service();
    let err = profiles.update_profile("ghost", "name", None).await.unwrap_err();
    assert!(matches!(err, ForgeError::NotFound(_)));
}
