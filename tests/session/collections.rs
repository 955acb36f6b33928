use std::sync::Arc;

use collection_sync::{CollectionAttrs, CollectionId, Level, RemoteStore, SyncError};

use crate::support::{binder, config, flush, session, session_with, ScriptedRemote};

#[tokio::test]
async fn create_update_delete() {
    let (store, _) = binder();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, notifier) = session(&remote);
    session.refresh().await.unwrap();

    let trade = session
        .create_collection(CollectionAttrs::new("  Trade  ").with_language("en"))
        .await
        .unwrap();
    assert_eq!(trade.name, "Trade");
    assert_eq!(session.collections().len(), 2);
    assert!(remote.store.collection(trade.id).is_some());

    let renamed = session
        .update_collection(trade.id, CollectionAttrs::new("Trade binder"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Trade binder");
    assert!(renamed.version > trade.version);
    assert_eq!(session.collection(trade.id).unwrap().name, "Trade binder");

    session.delete_collection(trade.id).await.unwrap();
    assert!(session.collection(trade.id).is_none());
    assert!(remote.store.collection(trade.id).is_none());

    let messages: Vec<String> = notifier
        .notifications()
        .into_iter()
        .map(|n| n.message)
        .collect();
    assert_eq!(
        messages,
        [
            "Created collection \"Trade\"",
            "Saved collection \"Trade binder\"",
            "Deleted \"Trade binder\"",
        ]
    );
}

#[tokio::test]
async fn blank_names_are_rejected_locally() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, notifier) = session(&remote);
    session.refresh().await.unwrap();

    let err = session
        .create_collection(CollectionAttrs::new("   "))
        .await
        .unwrap_err();
    assert_eq!(err, SyncError::InvalidName);
    assert!(err.is_user_error());

    let err = session
        .update_collection(binder.id, CollectionAttrs::new(""))
        .await
        .unwrap_err();
    assert_eq!(err, SyncError::InvalidName);

    assert_eq!(remote.store.list_collections().await.unwrap().len(), 1);
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn unknown_collections_are_rejected() {
    let (store, _) = binder();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, _) = session(&remote);

    assert_eq!(
        session.delete_collection(CollectionId(42)).await.unwrap_err(),
        SyncError::UnknownCollection(CollectionId(42))
    );
    assert_eq!(
        session
            .update_collection(CollectionId(42), CollectionAttrs::new("x"))
            .await
            .unwrap_err(),
        SyncError::UnknownCollection(CollectionId(42))
    );
}

#[tokio::test]
async fn delete_cascades_cards_and_active_selection() {
    let (store, binder) = binder();
    store.seed_card(binder.id, "card-1", 2).unwrap();
    store.seed_card(binder.id, "card-2", 1).unwrap();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, _) = session(&remote);
    session.refresh().await.unwrap();
    session.set_active_collection(binder.id).unwrap();

    session.delete_collection(binder.id).await.unwrap();

    assert!(session.active_collection().is_none());
    assert!(session.collection_cards(binder.id).is_empty());
    assert!(remote.store.list_collection_cards().await.unwrap().is_empty());
    assert_eq!(
        session.request_add_card("card-1").unwrap_err(),
        SyncError::NoActiveCollection
    );
}

#[tokio::test]
async fn update_of_collection_deleted_elsewhere_refetches() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, notifier) = session(&remote);
    session.refresh().await.unwrap();

    remote.store.delete_collection(binder.id).await.unwrap();
    let err = session
        .update_collection(binder.id, CollectionAttrs::new("Renamed"))
        .await
        .unwrap_err();

    assert!(err.remote().unwrap().is_conflict());
    assert!(session.collection(binder.id).is_none());
    assert_eq!(notifier.count(Level::Error), 1);
}

#[tokio::test]
async fn local_create_survives_an_older_poll() {
    let (store, _) = binder();
    let remote = Arc::new(ScriptedRemote::new(store).gated_lists());
    let (session, _) = session(&remote);

    let poll = tokio::spawn({
        let session = session.clone();
        async move { session.refresh().await }
    });
    flush().await;

    let trade = session
        .create_collection(CollectionAttrs::new("Trade"))
        .await
        .unwrap();

    remote.release_lists(1);
    poll.await.unwrap().unwrap();

    assert!(session.collection(trade.id).is_some());
}

#[tokio::test]
async fn failed_card_call_does_not_revive_a_deleted_collection() {
    let (store, binder) = binder();
    store.seed_card(binder.id, "card-1", 1).unwrap();
    let remote = Arc::new(ScriptedRemote::new(store).gated());
    let (session, _) = session_with(&remote, config().with_refetch_on_conflict(false));
    session.refresh().await.unwrap();

    let add = session.add_card(Some(binder.id), "card-1").unwrap();
    flush().await;
    session.delete_collection(binder.id).await.unwrap();

    // The held write now reaches a server without the collection.
    remote.release_writes(1);
    let err = add.settled().await.unwrap_err();
    assert!(err.remote().unwrap().is_conflict());

    assert!(session.collection_cards(binder.id).is_empty());
    assert!(session.collections_containing("card-1").is_empty());
    assert_eq!(session.total_quantity(binder.id), 0);
    assert!(!session.effective_card_state("card-1", Some(binder.id)).in_collection);
}
