//! HTTP transport integration tests.
//!
//! Starts an axum server over an in-memory store and drives it through
//! `HttpRemoteStore`, both directly and from a session.

#![cfg(feature = "http")]

use std::sync::Arc;

use collection_sync::remote::http;
use collection_sync::{
    BufferedNotifier, CardId, CollectionAttrs, CollectionId, CollectionSession, HttpRemoteStore,
    InMemoryRemoteStore, Level, RemoteError, RemoteStore, SyncConfig,
};
use serde_json::json;

/// Bind to port 0 and return the actual address.
async fn start_server(store: InMemoryRemoteStore) -> String {
    let app = http::router(Arc::new(store));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn card_lifecycle_over_http() {
    let store = InMemoryRemoteStore::new();
    let binder = store.seed_collection("Binder").unwrap();
    let base = start_server(store.clone()).await;
    let remote = HttpRemoteStore::new(&base).unwrap();
    let card = CardId::from("card-1");

    let row = remote.create_collection_card(binder.id, &card).await.unwrap();
    assert_eq!(row.quantity, 1);
    let row = remote.create_collection_card(binder.id, &card).await.unwrap();
    assert_eq!(row.quantity, 2);

    let row = remote
        .update_collection_card_quantity(binder.id, &card, 5)
        .await
        .unwrap();
    assert_eq!(row.quantity, 5);
    assert_eq!(store.card(binder.id, "card-1").unwrap().version, row.version);

    let cards = remote.list_collection_cards().await.unwrap();
    assert_eq!(cards.len(), 1);

    remote.delete_collection_card(binder.id, &card).await.unwrap();
    remote.delete_collection_card(binder.id, &card).await.unwrap();
    assert!(store.card(binder.id, "card-1").is_none());
}

#[tokio::test]
async fn collection_routes() {
    let store = InMemoryRemoteStore::new();
    let base = start_server(store.clone()).await;
    let remote = HttpRemoteStore::new(&base).unwrap();

    let created = remote
        .create_collection(&CollectionAttrs::new("Trade").with_language("de"))
        .await
        .unwrap();
    assert_eq!(created.language, "de");

    let updated = remote
        .update_collection(created.id, &CollectionAttrs::new("Trades"))
        .await
        .unwrap();
    assert_eq!(updated.name, "Trades");
    assert_eq!(remote.list_collections().await.unwrap().len(), 1);

    remote.delete_collection(created.id).await.unwrap();
    assert!(remote.list_collections().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_collection_maps_to_not_found() {
    let base = start_server(InMemoryRemoteStore::new()).await;
    let remote = HttpRemoteStore::new(&base).unwrap();

    let err = remote
        .create_collection_card(CollectionId(7), &CardId::from("card-1"))
        .await
        .unwrap_err();

    assert_eq!(err, RemoteError::NotFound("collection 7".into()));
    assert!(err.is_conflict());
}

#[tokio::test]
async fn card_ids_are_path_escaped() {
    let store = InMemoryRemoteStore::new();
    let binder = store.seed_collection("Binder").unwrap();
    let base = start_server(store.clone()).await;
    let remote = HttpRemoteStore::new(&base).unwrap();

    let card = CardId::from("sv1/25 holo");
    remote.create_collection_card(binder.id, &card).await.unwrap();

    assert_eq!(store.card(binder.id, "sv1/25 holo").unwrap().quantity, 1);
}

#[tokio::test]
async fn error_body_is_json() {
    let base = start_server(InMemoryRemoteStore::new()).await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("{base}/collections/3/cards/card-1"))
        .json(&json!({ "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "error": "collection 3" }));
}

#[tokio::test]
async fn unreachable_server_is_a_retryable_failure() {
    let store = InMemoryRemoteStore::new();
    let binder = store.seed_collection("Binder").unwrap();
    // Nothing listens on port 1.
    let remote = HttpRemoteStore::new("http://127.0.0.1:1").unwrap();
    let notifier = BufferedNotifier::new();
    let session = CollectionSession::builder(remote)
        .with_config(SyncConfig::default().with_strict_invariants(true))
        .with_notifier(notifier.clone())
        .build();

    let err = session
        .add_card(Some(binder.id), "card-1")
        .unwrap()
        .settled()
        .await
        .unwrap_err();

    assert!(err.remote().unwrap().is_retryable());
    assert!(!session.effective_card_state("card-1", Some(binder.id)).in_collection);
    assert_eq!(notifier.count(Level::Error), 1);
    assert!(notifier.notifications()[0].retryable);
}

#[tokio::test]
async fn session_over_http() {
    let store = InMemoryRemoteStore::new();
    let binder = store.seed_collection("Binder").unwrap();
    store.seed_card(binder.id, "card-1", 2).unwrap();
    let base = start_server(store.clone()).await;

    let session = CollectionSession::builder(HttpRemoteStore::new(&base).unwrap())
        .with_config(SyncConfig::default().with_strict_invariants(true))
        .build();
    session.on_mount().await.unwrap();
    session.set_active_collection(binder.id).unwrap();
    assert_eq!(session.effective_card_state("card-1", None).quantity, 2);

    session
        .request_remove_card("card-1")
        .unwrap()
        .settled()
        .await
        .unwrap();

    assert_eq!(store.card(binder.id, "card-1").unwrap().quantity, 1);
    assert_eq!(session.effective_card_state("card-1", None).quantity, 1);
}
