use std::collections::{HashMap, HashSet};

use crate::cache::Protection;
use crate::model::{CardKey, CollectionId};

/// Marks the local epoch at which a refresh was issued. Every refresh gets
/// its own epoch, so tickets order refreshes by issue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket {
    pub started_at: u64,
}

/// Records when each key last committed, relative to a local monotonic
/// epoch, so a refresh that was issued before a commit cannot overwrite it.
#[derive(Debug, Default, Clone)]
pub struct CommitLedger {
    epoch: u64,
    applied_through: u64,
    cards: HashMap<CardKey, u64>,
    collections: HashMap<CollectionId, u64>,
    deleted: HashSet<CollectionId>,
}

impl CommitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn record_card(&mut self, key: &CardKey) -> u64 {
        self.epoch += 1;
        self.cards.insert(key.clone(), self.epoch);
        self.epoch
    }

    pub fn record_collection(&mut self, id: CollectionId) -> u64 {
        self.epoch += 1;
        self.collections.insert(id, self.epoch);
        self.epoch
    }

    /// Collection deleted locally. Card calls still in flight against it
    /// must not bring its rows back.
    pub fn record_deleted_collection(&mut self, id: CollectionId) -> u64 {
        self.deleted.insert(id);
        self.record_collection(id)
    }

    pub fn is_deleted(&self, id: CollectionId) -> bool {
        self.deleted.contains(&id)
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.epoch += 1;
        RefreshTicket {
            started_at: self.epoch,
        }
    }

    /// A newer refresh has already been applied; this one carries older data.
    pub fn is_superseded(&self, ticket: RefreshTicket) -> bool {
        ticket.started_at < self.applied_through
    }

    /// Keys whose local value is newer than anything a refresh issued at
    /// `ticket` can contain, plus every key with a call still in flight.
    pub fn protection<'a>(
        &self,
        ticket: RefreshTicket,
        in_flight: impl IntoIterator<Item = &'a CardKey>,
    ) -> Protection {
        let mut protection = Protection::none();
        protection.cards.extend(
            self.cards
                .iter()
                .filter(|(_, epoch)| **epoch > ticket.started_at)
                .map(|(key, _)| key.clone()),
        );
        protection.cards.extend(in_flight.into_iter().cloned());
        protection.collections.extend(
            self.collections
                .iter()
                .filter(|(_, epoch)| **epoch > ticket.started_at)
                .map(|(id, _)| *id),
        );
        protection
    }

    /// Forget commits a completed refresh already reflects.
    pub fn complete_refresh(&mut self, ticket: RefreshTicket) {
        self.applied_through = self.applied_through.max(ticket.started_at);
        self.cards.retain(|_, epoch| *epoch > ticket.started_at);
        self.collections.retain(|_, epoch| *epoch > ticket.started_at);
    }

    pub fn len(&self) -> usize {
        self.cards.len() + self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.cards.clear();
        self.collections.clear();
        self.deleted.clear();
    }
}
