use std::sync::Arc;

use collection_sync::{CardKey, RemoteStore};

use crate::support::{binder, flush, session, ScriptedRemote};

#[tokio::test]
async fn refresh_picks_up_changes_from_another_device() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, notifier) = session(&remote);
    session.on_mount().await.unwrap();
    assert_eq!(session.total_quantity(binder.id), 0);

    remote.store.seed_card(binder.id, "card-1", 3).unwrap();
    let deck = remote.store.seed_collection("Deck").unwrap();

    let stats = session.on_focus().await.unwrap();
    assert_eq!(stats.inserted, 2);
    assert_eq!(session.effective_card_state("card-1", Some(binder.id)).quantity, 3);
    assert_eq!(session.collections().len(), 2);
    assert!(session.collection(deck.id).is_some());

    remote.store.seed_card(binder.id, "card-1", 0).unwrap();
    let stats = session.refresh().await.unwrap();
    assert_eq!(stats.removed, 1);
    assert!(!session.effective_card_state("card-1", Some(binder.id)).in_collection);
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn refresh_keeps_unchanged_rows() {
    let (store, binder) = binder();
    store.seed_card(binder.id, "card-1", 1).unwrap();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, _) = session(&remote);

    session.refresh().await.unwrap();
    let stats = session.refresh().await.unwrap();

    assert!(!stats.changed());
    assert_eq!(stats.unchanged, 2);
}

#[tokio::test]
async fn poll_issued_before_a_commit_does_not_overwrite_it() {
    let (store, binder) = binder();
    store.seed_card(binder.id, "card-1", 1).unwrap();
    let remote = Arc::new(ScriptedRemote::new(store).gated_lists());
    let (session, _) = session(&remote);
    remote.release_lists(1);
    session.refresh().await.unwrap();

    // The poll reads the server before the add lands, and answers after.
    let poll = tokio::spawn({
        let session = session.clone();
        async move { session.refresh().await }
    });
    flush().await;

    session
        .add_card(Some(binder.id), "card-1")
        .unwrap()
        .settled()
        .await
        .unwrap();
    assert_eq!(remote.store.card(binder.id, "card-1").unwrap().quantity, 2);

    remote.release_lists(1);
    let stats = poll.await.unwrap().unwrap();

    assert_eq!(stats.protected, 1);
    assert_eq!(session.effective_card_state("card-1", Some(binder.id)).quantity, 2);

    // The next poll sees the commit and clears the protection.
    remote.release_lists(1);
    let stats = session.refresh().await.unwrap();
    assert_eq!(stats.protected, 0);
    assert_eq!(session.effective_card_state("card-1", Some(binder.id)).quantity, 2);
}

#[tokio::test]
async fn poll_does_not_touch_keys_in_flight() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store).gated());
    let (session, _) = session(&remote);
    session.refresh().await.unwrap();

    let intent = session.add_card(Some(binder.id), "card-1").unwrap();
    flush().await;
    // Another device writes the same key while our call is held.
    remote.store.seed_card(binder.id, "card-1", 5).unwrap();

    session.refresh().await.unwrap();
    let view = session.effective_card_state("card-1", Some(binder.id));
    assert_eq!(view.quantity, 1);
    assert!(view.is_loading);

    remote.release_writes(1);
    intent.settled().await.unwrap();
    assert_eq!(session.effective_card_state("card-1", Some(binder.id)).quantity, 6);
}

#[tokio::test]
async fn collection_deleted_elsewhere_clears_active_selection() {
    let (store, binder) = binder();
    store.seed_card(binder.id, "card-1", 1).unwrap();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, _) = session(&remote);
    session.refresh().await.unwrap();
    session.set_active_collection(binder.id).unwrap();

    remote.store.delete_collection(binder.id).await.unwrap();
    session.refresh().await.unwrap();

    assert!(session.active_collection().is_none());
    assert!(session.collections().is_empty());
    assert!(!session.is_pending(&CardKey::new(binder.id, "card-1")));
    assert_eq!(session.collection_cards(binder.id), vec![]);
    assert!(session.collections_containing("card-1").is_empty());
}

#[tokio::test]
async fn older_poll_answering_last_is_discarded() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, _) = session(&remote);
    session.refresh().await.unwrap();

    // The first poll reads the server before another device adds a card.
    let answer_older = remote.hold_next_list();
    let older = tokio::spawn({
        let session = session.clone();
        async move { session.refresh().await }
    });
    flush().await;
    remote.store.seed_card(binder.id, "card-1", 3).unwrap();

    let answer_newer = remote.hold_next_list();
    let newer = tokio::spawn({
        let session = session.clone();
        async move { session.refresh().await }
    });
    flush().await;

    answer_newer.send(()).unwrap();
    newer.await.unwrap().unwrap();
    assert_eq!(session.effective_card_state("card-1", Some(binder.id)).quantity, 3);

    answer_older.send(()).unwrap();
    let stats = older.await.unwrap().unwrap();

    assert!(!stats.changed());
    assert_eq!(session.effective_card_state("card-1", Some(binder.id)).quantity, 3);
}
