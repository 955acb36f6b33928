use super::CollectionSession;
use crate::cache::{LoadMode, LoadStats};
use crate::error::{Result, SyncError};
use crate::remote::RemoteStore;

impl<R: RemoteStore> CollectionSession<R> {
    /// Refetch every collection and card and reconcile the cache with them.
    ///
    /// Keys with a call in flight, keys committed after the refetch was
    /// issued and cached rows with a newer version keep their local value.
    /// A refetch that completes after a newer one was applied is discarded.
    pub async fn refresh(&self) -> Result<LoadStats> {
        let (ticket, generation) = {
            let mut state = self.state();
            if state.closed {
                return Err(SyncError::SessionClosed);
            }
            (state.ledger.begin_refresh(), state.generation)
        };

        let remote = &self.inner.remote;
        let (collections, cards) =
            tokio::try_join!(remote.list_collections(), remote.list_collection_cards())?;

        let mut guard = self.state();
        let state = &mut *guard;
        if state.closed || state.generation != generation {
            return Err(SyncError::SessionClosed);
        }
        if state.ledger.is_superseded(ticket) {
            tracing::debug!(started_at = ticket.started_at, "discarding superseded refresh");
            return Ok(LoadStats::default());
        }

        let protection = state.ledger.protection(ticket, state.locks.pending_keys());
        let stats = state
            .cache
            .load_with(collections, cards, LoadMode::Replace, &protection);
        state.ledger.complete_refresh(ticket);

        if let Some(active) = state.active {
            if state.cache.collection(active).is_none() {
                tracing::info!(collection = %active, "active collection no longer exists");
                state.active = None;
            }
        }

        tracing::debug!(
            started_at = ticket.started_at,
            inserted = stats.inserted,
            updated = stats.updated,
            removed = stats.removed,
            stale = stats.stale,
            protected = stats.protected,
            "cache reconciled"
        );
        Ok(stats)
    }

    /// Full refetch when a view first shows the collection.
    pub async fn on_mount(&self) -> Result<LoadStats> {
        self.refresh().await
    }

    /// Full refetch when the view regains focus.
    pub async fn on_focus(&self) -> Result<LoadStats> {
        self.refresh().await
    }
}
