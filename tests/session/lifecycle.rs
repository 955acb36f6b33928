use std::sync::{Arc, Mutex};

use collection_sync::{
    CollectionSession, EffectiveCardState, InMemoryRemoteStore, Level, Notification, SyncConfig,
    SyncError,
};

use crate::support::{binder, flush, session, ScriptedRemote};

#[tokio::test]
async fn close_settles_outstanding_intents() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store).gated());
    let (session, notifier) = session(&remote);
    session.refresh().await.unwrap();

    let first = session.add_card(Some(binder.id), "card-1").unwrap();
    let second = session.add_card(Some(binder.id), "card-1").unwrap();
    session.close();

    assert_eq!(first.settled().await.unwrap_err(), SyncError::SessionClosed);
    assert_eq!(second.settled().await.unwrap_err(), SyncError::SessionClosed);
    assert!(session.is_closed());
    assert!(session.collections().is_empty());

    // The call still lands on the server, but the response is dropped.
    remote.release_writes(1);
    flush().await;
    assert_eq!(remote.store.card(binder.id, "card-1").unwrap().quantity, 1);
    assert_eq!(
        session.effective_card_state("card-1", Some(binder.id)),
        EffectiveCardState::default()
    );
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn closed_session_rejects_everything() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, _) = session(&remote);
    session.close();

    assert_eq!(
        session.add_card(Some(binder.id), "card-1").unwrap_err(),
        SyncError::SessionClosed
    );
    assert_eq!(session.refresh().await.unwrap_err(), SyncError::SessionClosed);
    assert_eq!(
        session
            .create_collection(collection_sync::CollectionAttrs::new("Trade"))
            .await
            .unwrap_err(),
        SyncError::SessionClosed
    );
    assert_eq!(remote.calls(), 0);
}

#[tokio::test]
async fn closures_work_as_notifiers() {
    let store = InMemoryRemoteStore::new();
    let binder = store.seed_collection("Binder").unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let session = CollectionSession::builder(store)
        .with_config(SyncConfig::default().with_strict_invariants(true))
        .with_notifier(move |n: Notification| sink.lock().unwrap().push(n.level))
        .build();

    session
        .add_card(Some(binder.id), "card-1")
        .unwrap()
        .settled()
        .await
        .unwrap();

    assert_eq!(seen.lock().unwrap().as_slice(), [Level::Success]);
}

#[tokio::test]
async fn default_session_uses_default_config() {
    let session = CollectionSession::new(InMemoryRemoteStore::new());
    assert_eq!(session.config(), &SyncConfig::default());
    assert!(session.collections().is_empty());
    assert!(!session.has_pending());
}
