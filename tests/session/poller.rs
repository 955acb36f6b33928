use std::sync::Arc;
use std::time::Duration;

use collection_sync::{PollerStats, ReconcilePoller};

use crate::support::{binder, config, eventually, flush, session_with, ScriptedRemote};

#[tokio::test(start_paused = true)]
async fn polls_on_interval() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, _) = session_with(&remote, config().with_poll_interval(Duration::from_secs(30)));
    session.on_mount().await.unwrap();

    let poller = ReconcilePoller::spawn(session.clone());
    remote.store.seed_card(binder.id, "card-1", 2).unwrap();

    tokio::time::advance(Duration::from_secs(10)).await;
    flush().await;
    assert_eq!(session.total_quantity(binder.id), 0);

    tokio::time::advance(Duration::from_secs(20)).await;
    eventually(|| session.total_quantity(binder.id) == 2).await;

    let stats = poller.stop().await;
    assert_eq!(
        stats,
        PollerStats {
            polls: 1,
            failures: 0,
            skipped: 0
        }
    );
}

#[tokio::test(start_paused = true)]
async fn skips_while_pending_when_configured() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store).gated());
    let (session, _) = session_with(&remote, config().with_poll_while_pending(false));

    let poller = ReconcilePoller::spawn_with_interval(session.clone(), Duration::from_secs(5));
    let intent = session.add_card(Some(binder.id), "card-1").unwrap();
    flush().await;

    tokio::time::advance(Duration::from_secs(5)).await;
    flush().await;

    remote.release_writes(1);
    intent.settled().await.unwrap();

    tokio::time::advance(Duration::from_secs(5)).await;
    flush().await;

    let stats = poller.stop().await;
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.polls, 1);
}

#[tokio::test(start_paused = true)]
async fn exits_when_session_closes() {
    let (store, _) = binder();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, _) = session_with(&remote, config());

    let poller = ReconcilePoller::spawn_with_interval(session.clone(), Duration::from_secs(1));
    session.close();

    tokio::time::advance(Duration::from_secs(1)).await;
    eventually(|| poller.is_finished()).await;

    assert_eq!(poller.stop().await, PollerStats::default());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_poller_stops_it() {
    let (store, binder) = binder();
    let remote = Arc::new(ScriptedRemote::new(store));
    let (session, _) = session_with(&remote, config());

    drop(ReconcilePoller::spawn_with_interval(
        session.clone(),
        Duration::from_secs(1),
    ));
    remote.store.seed_card(binder.id, "card-1", 1).unwrap();

    tokio::time::advance(Duration::from_secs(2)).await;
    flush().await;
    assert!(session.collections().is_empty());
}
