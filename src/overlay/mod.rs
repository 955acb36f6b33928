//! Optimistic overlay - speculative per-key deltas layered over the cache.
//!
//! The overlay is written only by the coordinator. Everything else reads the
//! combined value through [`effective_state`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::EntityCache;
use crate::model::{CardKey, CollectionCard, CollectionId};

/// A speculative change for one key that the server has not confirmed yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimisticDelta {
    /// Total unconfirmed quantity change relative to the cached row.
    pub pending_delta: i64,
    /// Part of `pending_delta` carried by the outstanding remote call.
    pub in_flight_delta: i64,
    pub is_loading: bool,
    pub has_error: bool,
    /// Cached row when the outstanding call was dispatched; restored on failure.
    pub previous_snapshot: Option<Arc<CollectionCard>>,
}

impl OptimisticDelta {
    pub(crate) fn dispatched(previous: Option<Arc<CollectionCard>>, delta: i64) -> Self {
        Self {
            pending_delta: delta,
            in_flight_delta: delta,
            is_loading: true,
            has_error: false,
            previous_snapshot: previous,
        }
    }

    /// Delta accepted while a call was outstanding and not yet sent.
    pub fn queued_delta(&self) -> i64 {
        self.pending_delta - self.in_flight_delta
    }
}

/// The value consumers observe for one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EffectiveCardState {
    pub in_collection: bool,
    pub quantity: u32,
    pub is_loading: bool,
    pub has_error: bool,
}

#[derive(Debug, Default, Clone)]
pub struct Overlay {
    entries: HashMap<CardKey, OptimisticDelta>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CardKey) -> Option<&OptimisticDelta> {
        self.entries.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &CardKey) -> Option<&mut OptimisticDelta> {
        self.entries.get_mut(key)
    }

    pub(crate) fn insert(&mut self, key: CardKey, delta: OptimisticDelta) {
        self.entries.insert(key, delta);
    }

    pub(crate) fn remove(&mut self, key: &CardKey) -> Option<OptimisticDelta> {
        self.entries.remove(key)
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&CardKey, &mut OptimisticDelta) -> bool) {
        self.entries.retain(keep);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &CardKey> {
        self.entries.keys()
    }

    /// Keys of one collection that carry an overlay entry.
    pub fn keys_in(&self, collection_id: CollectionId) -> impl Iterator<Item = &CardKey> {
        self.entries
            .keys()
            .filter(move |key| key.collection_id == collection_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Combine cached truth with any pending delta. The quantity never drops
/// below zero.
pub fn effective_state(cache: &EntityCache, overlay: &Overlay, key: &CardKey) -> EffectiveCardState {
    let cached = cache.card(key).map(|row| row.quantity).unwrap_or(0);
    match overlay.get(key) {
        None => EffectiveCardState {
            in_collection: cached > 0,
            quantity: cached,
            is_loading: false,
            has_error: false,
        },
        Some(delta) => {
            let quantity = (i64::from(cached) + delta.pending_delta).clamp(0, i64::from(u32::MAX)) as u32;
            EffectiveCardState {
                in_collection: quantity > 0,
                quantity,
                is_loading: delta.is_loading,
                has_error: delta.has_error,
            }
        }
    }
}
