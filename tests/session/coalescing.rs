use std::sync::Arc;
use std::time::Duration;

use collection_sync::{Intent, Level};

use crate::support::{binder, config, flush, session, session_with, ScriptedRemote};

#[tokio::test]
async fn one_call_in_flight_per_key() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store).gated());
    let (session, notifier) = session(&remote);

    let first = session.add_card(Some(binder.id), "card-1").unwrap();
    let second = session.add_card(Some(binder.id), "card-1").unwrap();
    let third = session.add_card(Some(binder.id), "card-1").unwrap();
    flush().await;

    assert!(first.is_dispatched());
    assert!(second.is_coalesced());
    assert!(third.is_coalesced());
    assert_eq!(remote.calls(), 1);
    assert_eq!(session.effective_card_state("card-1", Some(binder.id)).quantity, 3);

    // The first call commits; the coalesced delta goes out as one follow-up.
    remote.release_writes(1);
    first.settled().await.unwrap();
    flush().await;
    assert_eq!(remote.calls(), 2);
    assert_eq!(remote.in_flight(), 1);
    let view = session.effective_card_state("card-1", Some(binder.id));
    assert_eq!(view.quantity, 3);
    assert!(view.is_loading);

    remote.release_writes(1);
    second.settled().await.unwrap();
    third.settled().await.unwrap();

    assert_eq!(remote.max_in_flight(), 1);
    assert_eq!(remote.store.card(binder.id, "card-1").unwrap().quantity, 3);
    assert_eq!(notifier.count(Level::Success), 1);
}

#[tokio::test]
async fn add_then_remove_cancels_out() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store).gated());
    let (session, _) = session(&remote);

    let add = session.add_card(Some(binder.id), "card-1").unwrap();
    let add_again = session.add_card(Some(binder.id), "card-1").unwrap();
    let remove = session.remove_card(Some(binder.id), "card-1").unwrap();
    assert_eq!(session.effective_card_state("card-1", Some(binder.id)).quantity, 1);

    remote.release_writes(1);
    add.settled().await.unwrap();
    add_again.settled().await.unwrap();
    remove.settled().await.unwrap();

    assert_eq!(remote.calls(), 1);
    assert_eq!(remote.store.card(binder.id, "card-1").unwrap().quantity, 1);
}

#[tokio::test(start_paused = true)]
async fn intents_during_cooldown_are_absorbed() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, _) = session(&remote);

    session
        .add_card(Some(binder.id), "card-1")
        .unwrap()
        .settled()
        .await
        .unwrap();

    let burst = session.add_card(Some(binder.id), "card-1").unwrap();
    assert!(matches!(burst, Intent::Debounced));
    burst.settled().await.unwrap();
    assert_eq!(session.effective_card_state("card-1", Some(binder.id)).quantity, 1);
    assert_eq!(remote.calls(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(session.release_expired(), 1);

    let later = session.add_card(Some(binder.id), "card-1").unwrap();
    assert!(later.is_dispatched());
    later.settled().await.unwrap();
    assert_eq!(remote.store.card(binder.id, "card-1").unwrap().quantity, 2);
}

#[tokio::test]
async fn zero_cooldown_dispatches_back_to_back() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, _) = session_with(&remote, config().with_cooldown(Duration::ZERO));

    for _ in 0..3 {
        let intent = session.add_card(Some(binder.id), "card-1").unwrap();
        assert!(intent.is_dispatched());
        intent.settled().await.unwrap();
    }

    assert_eq!(remote.calls(), 3);
    assert_eq!(remote.store.card(binder.id, "card-1").unwrap().quantity, 3);
}
