use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::EntityCache;
use crate::model::{CardKey, Collection, CollectionCard, CollectionId};

/// How a snapshot relates to what is already cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// The snapshot is complete: cached rows missing from it are removed.
    #[default]
    Replace,
    /// The snapshot is partial: rows missing from it are left alone.
    Merge,
}

/// Keys whose local value must survive a load untouched.
#[derive(Debug, Clone, Default)]
pub struct Protection {
    pub cards: HashSet<CardKey>,
    pub collections: HashSet<CollectionId>,
}

impl Protection {
    pub fn none() -> Self {
        Self::default()
    }

    /// Cards of a protected collection are protected with it.
    fn covers_card(&self, key: &CardKey) -> bool {
        self.cards.contains(key) || self.collections.contains(&key.collection_id)
    }

    fn covers_collection(&self, id: CollectionId) -> bool {
        self.collections.contains(&id)
    }
}

/// What a load did, summed over both entity types.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    /// Incoming rows older than the cached row.
    pub stale: usize,
    /// Keys skipped because they were protected.
    pub protected: usize,
}

impl LoadStats {
    pub fn changed(&self) -> bool {
        self.inserted + self.updated + self.removed > 0
    }
}

impl EntityCache {
    /// Replace the cache contents with a full snapshot.
    pub fn load(
        &mut self,
        collections: Vec<Collection>,
        cards: Vec<CollectionCard>,
    ) -> LoadStats {
        self.load_with(collections, cards, LoadMode::Replace, &Protection::none())
    }

    /// Apply a snapshot, keeping protected keys and newer cached rows.
    ///
    /// Duplicate keys inside the snapshot resolve by version, then
    /// timestamp, then arrival order (later wins).
    pub fn load_with(
        &mut self,
        collections: Vec<Collection>,
        cards: Vec<CollectionCard>,
        mode: LoadMode,
        protection: &Protection,
    ) -> LoadStats {
        let mut stats = LoadStats::default();

        let mut incoming_collections: BTreeMap<CollectionId, Collection> = BTreeMap::new();
        for collection in collections {
            match incoming_collections.get(&collection.id) {
                Some(existing) if !collection.supersedes(existing) => {}
                _ => {
                    incoming_collections.insert(collection.id, collection);
                }
            }
        }

        let mut incoming_cards: BTreeMap<CardKey, CollectionCard> = BTreeMap::new();
        for card in cards {
            let key = card.key();
            match incoming_cards.get(&key) {
                Some(existing) if !card.supersedes(existing) => {}
                _ => {
                    incoming_cards.insert(key, card);
                }
            }
        }

        if mode == LoadMode::Replace {
            let gone: Vec<CollectionId> = self
                .collections
                .keys()
                .filter(|id| !incoming_collections.contains_key(id))
                .copied()
                .collect();
            for id in gone {
                if protection.covers_collection(id) {
                    stats.protected += 1;
                } else {
                    self.collections.remove(&id);
                    stats.removed += 1;
                }
            }

            let gone: Vec<CardKey> = self
                .cards
                .keys()
                .filter(|key| !incoming_cards.contains_key(key))
                .cloned()
                .collect();
            for key in gone {
                if protection.covers_card(&key) {
                    stats.protected += 1;
                } else {
                    self.cards.remove(&key);
                    stats.removed += 1;
                }
            }
        }

        for (id, collection) in incoming_collections {
            if protection.covers_collection(id) {
                stats.protected += 1;
                continue;
            }
            match self.collections.get(&id) {
                Some(cached) if cached.as_ref() == &collection => stats.unchanged += 1,
                Some(cached) if cached.version > collection.version => stats.stale += 1,
                Some(_) => {
                    self.collections.insert(id, Arc::new(collection));
                    stats.updated += 1;
                }
                None => {
                    self.collections.insert(id, Arc::new(collection));
                    stats.inserted += 1;
                }
            }
        }

        for (key, card) in incoming_cards {
            if protection.covers_card(&key) {
                stats.protected += 1;
                continue;
            }
            match self.cards.get(&key) {
                Some(cached) if cached.as_ref() == &card => stats.unchanged += 1,
                Some(cached) if cached.version > card.version => stats.stale += 1,
                Some(_) if card.quantity == 0 => {
                    self.cards.remove(&key);
                    stats.removed += 1;
                }
                Some(_) => {
                    self.cards.insert(key, Arc::new(card));
                    stats.updated += 1;
                }
                None if card.quantity == 0 => {}
                None => {
                    self.cards.insert(key, Arc::new(card));
                    stats.inserted += 1;
                }
            }
        }

        stats
    }
}
