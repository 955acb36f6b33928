use std::time::Duration;

use tokio::time::Instant;

use super::accept::op_for_target;
use super::RemoteOp;
use crate::config::SyncConfig;
use crate::lock::Waiter;
use crate::model::{CardKey, CollectionCard};
use crate::overlay::OptimisticDelta;
use crate::remote::RemoteError;
use crate::state::SyncState;

/// Result of settling one remote call.
#[derive(Debug)]
pub(crate) enum Settled {
    /// The call committed but intents coalesced meanwhile still need a call.
    FollowUp {
        op: RemoteOp,
        /// Intents carried by the committed call.
        committed: Vec<Waiter>,
    },
    /// The call committed and nothing is left for the key.
    Committed { waiters: Vec<Waiter>, after: u32 },
    /// The call failed; the key was restored to its pre-call row.
    RolledBack {
        waiters: Vec<Waiter>,
        error: RemoteError,
        /// Delta the failed call carried.
        delta: i64,
    },
}

/// Apply the outcome of the outstanding call for `key`.
///
/// `Ok(None)` is the outcome of a delete.
pub(crate) fn settle(
    state: &mut SyncState,
    config: &SyncConfig,
    key: &CardKey,
    outcome: Result<Option<CollectionCard>, RemoteError>,
    now: Instant,
) -> Settled {
    let entry = state.overlay.get(key).cloned().unwrap_or_default();
    // The collection was deleted while the call was in flight.
    let orphaned = state.ledger.is_deleted(key.collection_id);

    match outcome {
        Ok(row) => {
            state.ledger.record_card(key);
            let committed = match row {
                Some(row) if !orphaned => state.cache.put_card(row),
                _ => {
                    state.cache.remove_card(key);
                    None
                }
            };
            let base = committed.as_ref().map(|row| row.quantity).unwrap_or(0);
            tracing::info!(key = %key, quantity = base, "mutation committed");

            let queued = entry.queued_delta();
            if queued != 0 && !orphaned {
                let target = (i64::from(base) + queued).clamp(0, i64::from(u32::MAX)) as u32;
                if target != base {
                    let delta = i64::from(target) - i64::from(base);
                    state
                        .overlay
                        .insert(key.clone(), OptimisticDelta::dispatched(committed, delta));
                    let op = op_for_target(target);
                    tracing::debug!(key = %key, ?op, delta, "dispatching coalesced follow-up");
                    return Settled::FollowUp {
                        op,
                        committed: state.locks.promote_queued(key),
                    };
                }
            }

            state.overlay.remove(key);
            Settled::Committed {
                waiters: state.locks.release(key, now, config.cooldown),
                after: base,
            }
        }
        Err(error) => {
            if orphaned {
                state.cache.remove_card(key);
                state.overlay.remove(key);
            } else {
                state.cache.restore_card(key, entry.previous_snapshot.clone());
                state.overlay.insert(
                    key.clone(),
                    OptimisticDelta {
                        has_error: true,
                        previous_snapshot: entry.previous_snapshot,
                        ..Default::default()
                    },
                );
            }
            tracing::warn!(key = %key, error = %error, "mutation rolled back");
            // No cooldown: a retry after a failure must reach the server.
            Settled::RolledBack {
                waiters: state.locks.release(key, now, Duration::ZERO),
                error,
                delta: entry.in_flight_delta,
            }
        }
    }
}
