//! Per-key mutation locks.
//!
//! One table holds both the in-flight lock and the post-settle cooldown, so a
//! key is always in exactly one of `Idle`, `Pending` or `Cooling`:
//!
//! ```text
//! Idle --try_lock--> Pending --release--> Cooling --(until elapses)--> Idle
//! ```
//!
//! Cooling slots expire lazily: a slot whose deadline has passed reads as
//! `Idle`, and `release_expired` drops such slots from the table.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::SyncError;
use crate::model::CardKey;

/// Completion handle of one accepted intent.
pub(crate) type Waiter = oneshot::Sender<Result<(), SyncError>>;

/// Observable lock state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Idle,
    /// A remote call is outstanding for the key.
    Pending,
    /// The key settled recently; new intents are absorbed until `until`.
    Cooling { until: Instant },
}

struct PendingSlot {
    /// Intents carried by the outstanding call.
    in_flight: Vec<Waiter>,
    /// Intents coalesced while the call was outstanding.
    queued: Vec<Waiter>,
}

enum Slot {
    Pending(PendingSlot),
    Cooling(Instant),
}

#[derive(Default)]
pub struct KeyLockTable {
    slots: HashMap<CardKey, Slot>,
}

impl KeyLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, key: &CardKey, now: Instant) -> KeyState {
        match self.slots.get(key) {
            Some(Slot::Pending(_)) => KeyState::Pending,
            Some(Slot::Cooling(until)) if *until > now => KeyState::Cooling { until: *until },
            _ => KeyState::Idle,
        }
    }

    pub fn is_pending(&self, key: &CardKey) -> bool {
        matches!(self.slots.get(key), Some(Slot::Pending(_)))
    }

    /// Keys with an outstanding remote call.
    pub fn pending_keys(&self) -> impl Iterator<Item = &CardKey> {
        self.slots.iter().filter_map(|(key, slot)| match slot {
            Slot::Pending(_) => Some(key),
            Slot::Cooling(_) => None,
        })
    }

    /// Take the lock for `key` if it is idle. Returns false otherwise.
    pub fn try_lock(&mut self, key: &CardKey, now: Instant) -> bool {
        if self.state(key, now) != KeyState::Idle {
            return false;
        }
        self.slots.insert(
            key.clone(),
            Slot::Pending(PendingSlot {
                in_flight: Vec::new(),
                queued: Vec::new(),
            }),
        );
        true
    }

    /// Attach an intent to the outstanding call.
    pub(crate) fn attach(&mut self, key: &CardKey, waiter: Waiter) {
        if let Some(Slot::Pending(slot)) = self.slots.get_mut(key) {
            slot.in_flight.push(waiter);
        }
    }

    /// Attach an intent that will ride on the follow-up call.
    pub(crate) fn enqueue(&mut self, key: &CardKey, waiter: Waiter) {
        if let Some(Slot::Pending(slot)) = self.slots.get_mut(key) {
            slot.queued.push(waiter);
        }
    }

    /// The outstanding call committed and a follow-up call takes over:
    /// returns the intents the committed call carried, and moves the queued
    /// intents onto the follow-up.
    pub(crate) fn promote_queued(&mut self, key: &CardKey) -> Vec<Waiter> {
        match self.slots.get_mut(key) {
            Some(Slot::Pending(slot)) => {
                let queued = std::mem::take(&mut slot.queued);
                std::mem::replace(&mut slot.in_flight, queued)
            }
            _ => Vec::new(),
        }
    }

    /// End the pending state and start the cooldown. Returns every waiter
    /// still attached to the key, in-flight ones first.
    pub(crate) fn release(&mut self, key: &CardKey, now: Instant, cooldown: Duration) -> Vec<Waiter> {
        let waiters = match self.slots.remove(key) {
            Some(Slot::Pending(mut slot)) => {
                slot.in_flight.append(&mut slot.queued);
                slot.in_flight
            }
            _ => Vec::new(),
        };
        if !cooldown.is_zero() {
            self.slots.insert(key.clone(), Slot::Cooling(now + cooldown));
        }
        waiters
    }

    /// Drop cooldown slots whose deadline has passed.
    pub fn release_expired(&mut self, now: Instant) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| !matches!(slot, Slot::Cooling(until) if *until <= now));
        before - self.slots.len()
    }

    /// Empty the table, returning every waiter that was still attached.
    pub(crate) fn clear(&mut self) -> Vec<Waiter> {
        let mut waiters = Vec::new();
        for (_, slot) in self.slots.drain() {
            if let Slot::Pending(mut slot) = slot {
                waiters.append(&mut slot.in_flight);
                waiters.append(&mut slot.queued);
            }
        }
        waiters
    }
}
