use tokio::time::Instant;

use super::{Mutation, RemoteOp, Settlement};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::lock::KeyState;
use crate::model::CardKey;
use crate::overlay::{effective_state, OptimisticDelta};
use crate::state::SyncState;

/// Result of accepting an intent, before the session turns it into an
/// [`Intent`](super::Intent).
#[derive(Debug)]
pub(crate) enum Accepted {
    Dispatch {
        op: RemoteOp,
        settlement: Settlement,
        /// Settled quantity when the call was dispatched.
        before: u32,
    },
    Coalesced(Settlement),
    Debounced,
    Unchanged,
}

/// Validate an intent and apply its optimistic delta.
///
/// User-input errors are returned before anything is touched.
pub(crate) fn accept(
    state: &mut SyncState,
    config: &SyncConfig,
    key: &CardKey,
    mutation: Mutation,
    now: Instant,
) -> Result<Accepted> {
    let target = match mutation {
        Mutation::SetQuantity(quantity) => {
            Some(u32::try_from(quantity).map_err(|_| SyncError::InvalidQuantity(quantity))?)
        }
        Mutation::Add | Mutation::Remove => None,
    };

    check_invariants(state, config, key);

    match state.locks.state(key, now) {
        KeyState::Cooling { .. } => {
            tracing::debug!(key = %key, ?mutation, "intent absorbed by cooldown");
            Ok(Accepted::Debounced)
        }
        KeyState::Pending => coalesce(state, key, mutation),
        KeyState::Idle => dispatch(state, key, mutation, target, now),
    }
}

fn coalesce(state: &mut SyncState, key: &CardKey, mutation: Mutation) -> Result<Accepted> {
    let step = match mutation {
        Mutation::Add => 1,
        Mutation::Remove => {
            if effective_state(&state.cache, &state.overlay, key).quantity == 0 {
                return Err(SyncError::QuantityUnderflow(key.clone()));
            }
            -1
        }
        Mutation::SetQuantity(_) => return Err(SyncError::AlreadyPending(key.clone())),
    };

    let Some(entry) = state.overlay.get_mut(key) else {
        return Err(SyncError::AlreadyPending(key.clone()));
    };
    entry.pending_delta += step;

    let (tx, settlement) = Settlement::channel();
    state.locks.enqueue(key, tx);
    tracing::debug!(key = %key, pending_delta = entry.pending_delta, "intent coalesced");
    Ok(Accepted::Coalesced(settlement))
}

fn dispatch(
    state: &mut SyncState,
    key: &CardKey,
    mutation: Mutation,
    target: Option<u32>,
    now: Instant,
) -> Result<Accepted> {
    let previous = state.cache.card(key).cloned();
    let before = previous.as_ref().map(|row| row.quantity).unwrap_or(0);

    let (delta, op) = match mutation {
        Mutation::Add => (1, RemoteOp::Increment),
        Mutation::Remove => {
            if before == 0 {
                return Err(SyncError::QuantityUnderflow(key.clone()));
            }
            (-1, op_for_target(before - 1))
        }
        Mutation::SetQuantity(_) => {
            let target = target.unwrap_or(before);
            if target == before {
                return Ok(Accepted::Unchanged);
            }
            (i64::from(target) - i64::from(before), op_for_target(target))
        }
    };

    // A leftover entry on an idle key is an error flag that outlived its
    // notification; it carries no delta.
    state.overlay.remove(key);

    if !state.locks.try_lock(key, now) {
        return Err(SyncError::AlreadyPending(key.clone()));
    }
    let (tx, settlement) = Settlement::channel();
    state.locks.attach(key, tx);
    state
        .overlay
        .insert(key.clone(), OptimisticDelta::dispatched(previous, delta));

    tracing::debug!(key = %key, ?op, delta, "intent dispatched");
    Ok(Accepted::Dispatch {
        op,
        settlement,
        before,
    })
}

pub(super) fn op_for_target(target: u32) -> RemoteOp {
    if target == 0 {
        RemoteOp::Delete
    } else {
        RemoteOp::SetQuantity(target)
    }
}

/// An overlay entry marked loading must have a pending lock behind it.
fn check_invariants(state: &mut SyncState, config: &SyncConfig, key: &CardKey) {
    let orphaned = state
        .overlay
        .get(key)
        .map_or(false, |entry| entry.is_loading && !state.locks.is_pending(key));
    if !orphaned {
        return;
    }
    if config.strict_invariants {
        panic!("overlay entry for {} is loading without an in-flight lock", key);
    }
    tracing::error!(key = %key, "loading overlay entry without in-flight lock, resetting key");
    state.overlay.remove(key);
}
