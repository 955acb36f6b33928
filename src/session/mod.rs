//! CollectionSession - the store object a UI talks to.
//!
//! One session is created per login and torn down with [`close`] on logout.
//! Reads are synchronous and cheap. Intents are synchronous too: they return
//! once the optimistic state is visible, and the remote call runs on a
//! spawned task, so they must be called from within a tokio runtime.
//!
//! ## Example
//!
//! ```ignore
//! use collection_sync::{CollectionSession, InMemoryRemoteStore};
//!
//! let session = CollectionSession::new(InMemoryRemoteStore::new());
//! session.refresh().await?;
//! session.set_active_collection(binder_id)?;
//!
//! let intent = session.request_add_card("card-1")?;
//! assert!(session.effective_card_state("card-1", None).is_loading);
//! intent.settled().await?;
//! ```
//!
//! [`close`]: CollectionSession::close

mod collections;
mod driver;
mod refresh;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::time::Instant;

use crate::config::SyncConfig;
use crate::coordinator::{self, Accepted, Intent, Mutation};
use crate::error::{Result, SyncError};
use crate::model::{CardId, CardKey, Collection, CollectionId};
use crate::notify::{NotificationSink, TracingNotifier};
use crate::overlay::{effective_state, EffectiveCardState};
use crate::remote::RemoteStore;
use crate::state::SyncState;

struct Inner<R> {
    remote: R,
    notifier: Arc<dyn NotificationSink>,
    config: SyncConfig,
    state: Mutex<SyncState>,
}

/// Handle to one synchronization session. Clones share the same state.
pub struct CollectionSession<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for CollectionSession<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Builder for a [`CollectionSession`].
pub struct SessionBuilder<R> {
    remote: R,
    config: SyncConfig,
    notifier: Arc<dyn NotificationSink>,
}

impl<R: RemoteStore> SessionBuilder<R> {
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_notifier(mut self, notifier: impl NotificationSink + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub fn build(self) -> CollectionSession<R> {
        CollectionSession {
            inner: Arc::new(Inner {
                remote: self.remote,
                notifier: self.notifier,
                config: self.config,
                state: Mutex::new(SyncState::default()),
            }),
        }
    }
}

impl<R: RemoteStore> CollectionSession<R> {
    /// Session with default configuration that logs its notifications.
    pub fn new(remote: R) -> Self {
        Self::builder(remote).build()
    }

    pub fn builder(remote: R) -> SessionBuilder<R> {
        SessionBuilder {
            remote,
            config: SyncConfig::default(),
            notifier: Arc::new(TracingNotifier),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn remote(&self) -> &R {
        &self.inner.remote
    }

    // Poisoning is recovered: no update panics between two writes.
    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Effective state of a card in `collection_id`, or in the active
    /// collection when `None`. Without a resolvable collection the card reads
    /// as absent.
    pub fn effective_card_state(
        &self,
        card_id: impl Into<CardId>,
        collection_id: Option<CollectionId>,
    ) -> EffectiveCardState {
        let state = self.state();
        match collection_id.or(state.active) {
            Some(collection_id) => effective_state(
                &state.cache,
                &state.overlay,
                &CardKey::new(collection_id, card_id),
            ),
            None => EffectiveCardState::default(),
        }
    }

    pub fn card_state(&self, key: &CardKey) -> EffectiveCardState {
        let state = self.state();
        effective_state(&state.cache, &state.overlay, key)
    }

    /// Every card of a collection that is present or has a mutation in
    /// flight, ordered by card id.
    pub fn collection_cards(&self, collection_id: CollectionId) -> Vec<(CardId, EffectiveCardState)> {
        let state = self.state();
        let mut keys: Vec<CardKey> = state
            .cache
            .cards_in(collection_id)
            .map(|row| row.key())
            .chain(state.overlay.keys_in(collection_id).cloned())
            .collect();
        keys.sort();
        keys.dedup();
        keys.into_iter()
            .map(|key| {
                let effective = effective_state(&state.cache, &state.overlay, &key);
                (key.card_id, effective)
            })
            .filter(|(_, effective)| effective.in_collection || effective.is_loading)
            .collect()
    }

    /// Sum of effective quantities in a collection.
    pub fn total_quantity(&self, collection_id: CollectionId) -> u64 {
        self.collection_cards(collection_id)
            .iter()
            .map(|(_, effective)| u64::from(effective.quantity))
            .sum()
    }

    /// Collections whose effective state contains the card.
    pub fn collections_containing(&self, card_id: impl Into<CardId>) -> Vec<CollectionId> {
        let card_id = card_id.into();
        let state = self.state();
        let mut ids: Vec<CollectionId> = state
            .cache
            .rows_for_card(&card_id)
            .map(|row| row.collection_id)
            .chain(
                state
                    .overlay
                    .keys()
                    .filter(|key| key.card_id == card_id)
                    .map(|key| key.collection_id),
            )
            .collect();
        ids.sort();
        ids.dedup();
        ids.retain(|id| {
            effective_state(&state.cache, &state.overlay, &CardKey::new(*id, card_id.clone()))
                .in_collection
        });
        ids
    }

    pub fn is_pending(&self, key: &CardKey) -> bool {
        self.state().locks.is_pending(key)
    }

    /// True while any key has a remote call outstanding.
    pub fn has_pending(&self) -> bool {
        self.state().locks.pending_keys().next().is_some()
    }

    pub fn collections(&self) -> Vec<Arc<Collection>> {
        self.state().cache.collections().cloned().collect()
    }

    pub fn collection(&self, id: CollectionId) -> Option<Arc<Collection>> {
        self.state().cache.collection(id).cloned()
    }

    pub fn active_collection(&self) -> Option<Arc<Collection>> {
        let state = self.state();
        state
            .active
            .and_then(|id| state.cache.collection(id).cloned())
    }

    /// Select the collection implicit intents apply to. It must be cached.
    pub fn set_active_collection(&self, id: CollectionId) -> Result<()> {
        let mut state = self.state();
        if state.cache.collection(id).is_none() {
            return Err(SyncError::UnknownCollection(id));
        }
        state.active = Some(id);
        Ok(())
    }

    pub fn clear_active_collection(&self) {
        self.state().active = None;
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Add one copy of a card to the active collection.
    pub fn request_add_card(&self, card_id: impl Into<CardId>) -> Result<Intent> {
        self.add_card(None, card_id)
    }

    /// Remove one copy of a card from the active collection.
    pub fn request_remove_card(&self, card_id: impl Into<CardId>) -> Result<Intent> {
        self.remove_card(None, card_id)
    }

    pub fn add_card(
        &self,
        collection_id: Option<CollectionId>,
        card_id: impl Into<CardId>,
    ) -> Result<Intent> {
        self.submit(collection_id, card_id.into(), Mutation::Add)
    }

    pub fn remove_card(
        &self,
        collection_id: Option<CollectionId>,
        card_id: impl Into<CardId>,
    ) -> Result<Intent> {
        self.submit(collection_id, card_id.into(), Mutation::Remove)
    }

    /// Set an absolute quantity. Rejected with `AlreadyPending` while a call
    /// is outstanding for the key.
    pub fn set_quantity(
        &self,
        collection_id: Option<CollectionId>,
        card_id: impl Into<CardId>,
        quantity: i64,
    ) -> Result<Intent> {
        self.submit(collection_id, card_id.into(), Mutation::SetQuantity(quantity))
    }

    fn submit(
        &self,
        collection_id: Option<CollectionId>,
        card_id: CardId,
        mutation: Mutation,
    ) -> Result<Intent> {
        let (key, accepted, generation) = {
            let mut state = self.state();
            if state.closed {
                return Err(SyncError::SessionClosed);
            }
            let collection_id = collection_id
                .or(state.active)
                .ok_or(SyncError::NoActiveCollection)?;
            let key = CardKey::new(collection_id, card_id);
            let accepted =
                coordinator::accept(&mut state, &self.inner.config, &key, mutation, Instant::now())?;
            (key, accepted, state.generation)
        };

        Ok(match accepted {
            Accepted::Dispatch {
                op,
                settlement,
                before,
            } => {
                self.spawn_driver(key, op, before, generation);
                Intent::Dispatched(settlement)
            }
            Accepted::Coalesced(settlement) => Intent::Coalesced(settlement),
            Accepted::Debounced => Intent::Debounced,
            Accepted::Unchanged => Intent::Unchanged,
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Drop cooldown slots that have expired.
    pub fn release_expired(&self) -> usize {
        self.state().locks.release_expired(Instant::now())
    }

    /// Tear the session down. Outstanding intents settle with
    /// `SessionClosed` and responses still in flight are discarded.
    pub fn close(&self) {
        let waiters = {
            let mut state = self.state();
            state.closed = true;
            state.generation += 1;
            state.cache.clear();
            state.overlay.clear();
            state.ledger.clear();
            state.active = None;
            state.locks.clear()
        };
        tracing::info!(abandoned = waiters.len(), "session closed");
        for waiter in waiters {
            let _ = waiter.send(Err(SyncError::SessionClosed));
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}
