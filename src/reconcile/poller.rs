//! Background reconciliation task.
//!
//! Refreshes a session on a fixed interval for as long as its view is
//! active, whether or not it has focus, so changes made from another device
//! show up within one interval.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::SyncError;
use crate::remote::RemoteStore;
use crate::session::CollectionSession;

/// Statistics from the poller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollerStats {
    /// Refreshes that were applied.
    pub polls: usize,
    pub failures: usize,
    /// Ticks skipped because a mutation was in flight.
    pub skipped: usize,
}

/// A spawned task that periodically refreshes a session.
///
/// ## Example
///
/// ```ignore
/// use collection_sync::{CollectionSession, ReconcilePoller};
///
/// let session = CollectionSession::new(remote);
/// session.on_mount().await?;
///
/// let poller = ReconcilePoller::spawn(session.clone());
///
/// // ... the view is showing ...
///
/// let stats = poller.stop().await;
/// println!("refreshed {} times", stats.polls);
/// ```
pub struct ReconcilePoller {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<PollerStats>,
}

impl ReconcilePoller {
    /// Spawn a poller using the session's configured interval.
    pub fn spawn<R: RemoteStore>(session: CollectionSession<R>) -> Self {
        let interval = session.config().poll_interval;
        Self::spawn_with_interval(session, interval)
    }

    /// Spawn a poller with an explicit interval. The first refresh happens
    /// one interval after spawning; mount and focus refresh on their own.
    pub fn spawn_with_interval<R: RemoteStore>(
        session: CollectionSession<R>,
        interval: Duration,
    ) -> Self {
        // `interval_at` rejects a zero period.
        let interval = interval.max(Duration::from_millis(1));
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let start = Instant::now() + interval;

        let handle = tokio::spawn(async move {
            let mut stats = PollerStats::default();
            let mut ticker = time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }

                session.release_expired();
                if !session.config().poll_while_pending && session.has_pending() {
                    stats.skipped += 1;
                    continue;
                }

                match session.refresh().await {
                    Ok(_) => stats.polls += 1,
                    Err(SyncError::SessionClosed) => break,
                    Err(err) => {
                        stats.failures += 1;
                        tracing::warn!(error = %err, "background refresh failed");
                    }
                }
            }

            tracing::debug!(
                polls = stats.polls,
                failures = stats.failures,
                skipped = stats.skipped,
                "poller stopped"
            );
            stats
        });

        Self {
            stop_tx: Some(stop_tx),
            handle,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the poller and return its statistics.
    pub async fn stop(mut self) -> PollerStats {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The task may already have exited on a closed session.
            let _ = stop_tx.send(());
        }
        match (&mut self.handle).await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::error!(error = %err, "poller task failed");
                PollerStats::default()
            }
        }
    }
}
