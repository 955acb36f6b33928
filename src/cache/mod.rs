//! EntityCache - normalized, in-memory mirror of the last known server truth.
//!
//! Rows are held behind `Arc` so that a reload which does not change a row
//! keeps the exact same allocation; consumers can compare with
//! `Arc::ptr_eq` to skip work for unchanged rows.
//!
//! The cache never talks to the network and never fails.

mod load;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::{CardId, CardKey, CardPatch, Collection, CollectionCard, CollectionId};

pub use load::{LoadMode, LoadStats, Protection};

#[derive(Debug, Default, Clone)]
pub struct EntityCache {
    collections: BTreeMap<CollectionId, Arc<Collection>>,
    cards: BTreeMap<CardKey, Arc<CollectionCard>>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(&self, id: CollectionId) -> Option<&Arc<Collection>> {
        self.collections.get(&id)
    }

    /// All collections, ordered by id.
    pub fn collections(&self) -> impl Iterator<Item = &Arc<Collection>> {
        self.collections.values()
    }

    pub fn card(&self, key: &CardKey) -> Option<&Arc<CollectionCard>> {
        self.cards.get(key)
    }

    /// Rows of one collection, ordered by card id.
    pub fn cards_in(
        &self,
        collection_id: CollectionId,
    ) -> impl Iterator<Item = &Arc<CollectionCard>> {
        self.cards
            .iter()
            .filter(move |(key, _)| key.collection_id == collection_id)
            .map(|(_, row)| row)
    }

    /// Rows for one card across every collection.
    pub fn rows_for_card<'a>(
        &'a self,
        card_id: &'a CardId,
    ) -> impl Iterator<Item = &'a Arc<CollectionCard>> + 'a {
        self.cards.values().filter(move |row| &row.card_id == card_id)
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Apply a partial update to one row, creating it when absent.
    ///
    /// A resulting quantity of 0 removes the row. Returns the row now cached.
    pub fn upsert_card(&mut self, key: &CardKey, patch: CardPatch) -> Option<Arc<CollectionCard>> {
        let row = patch.apply(key, self.cards.get(key).map(Arc::as_ref));
        self.put_card(row)
    }

    /// Store a whole row as received from the server (quantity 0 removes it).
    pub fn put_card(&mut self, row: CollectionCard) -> Option<Arc<CollectionCard>> {
        let key = row.key();
        if row.quantity == 0 {
            self.cards.remove(&key);
            return None;
        }
        match self.cards.get(&key) {
            Some(existing) if existing.as_ref() == &row => Some(existing.clone()),
            _ => {
                let row = Arc::new(row);
                self.cards.insert(key, row.clone());
                Some(row)
            }
        }
    }

    /// Put back a previously captured row, or its absence.
    pub fn restore_card(&mut self, key: &CardKey, snapshot: Option<Arc<CollectionCard>>) {
        match snapshot {
            Some(row) => {
                self.cards.insert(key.clone(), row);
            }
            None => {
                self.cards.remove(key);
            }
        }
    }

    /// Delete one row. Deleting an absent row is a no-op.
    pub fn remove_card(&mut self, key: &CardKey) -> Option<Arc<CollectionCard>> {
        self.cards.remove(key)
    }

    pub fn put_collection(&mut self, collection: Collection) -> Arc<Collection> {
        match self.collections.get(&collection.id) {
            Some(existing) if existing.as_ref() == &collection => existing.clone(),
            _ => {
                let collection = Arc::new(collection);
                self.collections.insert(collection.id, collection.clone());
                collection
            }
        }
    }

    /// Delete a collection and every card row it holds.
    pub fn remove_collection(&mut self, id: CollectionId) -> Option<Arc<Collection>> {
        self.cards.retain(|key, _| key.collection_id != id);
        self.collections.remove(&id)
    }

    pub fn clear(&mut self) {
        self.collections.clear();
        self.cards.clear();
    }
}
