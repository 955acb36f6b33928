use tokio::time::Instant;

use super::CollectionSession;
use crate::coordinator::{self, RemoteOp, Settled};
use crate::error::SyncError;
use crate::lock::Waiter;
use crate::model::{CardKey, CollectionCard};
use crate::notify::{Label, Notification};
use crate::remote::{RemoteError, RemoteStore};

fn resolve(waiters: Vec<Waiter>, result: Result<(), SyncError>) {
    for waiter in waiters {
        // The caller may have dropped its settlement.
        let _ = waiter.send(result.clone());
    }
}

impl<R: RemoteStore> CollectionSession<R> {
    /// Run the remote calls for one key until the chain settles.
    pub(super) fn spawn_driver(&self, key: CardKey, op: RemoteOp, before: u32, generation: u64) {
        let session = self.clone();
        tokio::spawn(async move { session.drive(key, op, before, generation).await });
    }

    async fn drive(&self, key: CardKey, mut op: RemoteOp, before: u32, generation: u64) {
        loop {
            let outcome = self.call(&key, op).await;

            let (settled, label) = {
                let mut state = self.state();
                if state.closed || state.generation != generation {
                    tracing::debug!(key = %key, "discarding response for closed session");
                    return;
                }
                let settled = coordinator::settle(
                    &mut state,
                    &self.inner.config,
                    &key,
                    outcome,
                    Instant::now(),
                );
                (settled, Label::collection(&state.cache, key.collection_id))
            };

            match settled {
                Settled::FollowUp { op: next, committed } => {
                    resolve(committed, Ok(()));
                    op = next;
                }
                Settled::Committed { waiters, after } => {
                    self.inner
                        .notifier
                        .notify(Notification::card_committed(&key, &label, before, after));
                    resolve(waiters, Ok(()));
                    return;
                }
                Settled::RolledBack {
                    waiters,
                    error,
                    delta,
                } => {
                    self.inner
                        .notifier
                        .notify(Notification::card_rolled_back(&key, &label, delta, &error));
                    self.clear_error_flag(&key);
                    resolve(waiters, Err(SyncError::RemoteCallFailed(error.clone())));

                    if error.is_conflict() && self.inner.config.refetch_on_conflict {
                        if let Err(err) = self.refresh().await {
                            tracing::warn!(key = %key, error = %err, "refetch after conflict failed");
                        }
                    }
                    return;
                }
            }
        }
    }

    /// Issue one remote call. `Ok(None)` means the row is gone.
    async fn call(&self, key: &CardKey, op: RemoteOp) -> Result<Option<CollectionCard>, RemoteError> {
        let remote = &self.inner.remote;
        let row = match op {
            RemoteOp::Increment => {
                remote
                    .create_collection_card(key.collection_id, &key.card_id)
                    .await?
            }
            RemoteOp::SetQuantity(quantity) => {
                remote
                    .update_collection_card_quantity(key.collection_id, &key.card_id, quantity)
                    .await?
            }
            RemoteOp::Delete => {
                remote
                    .delete_collection_card(key.collection_id, &key.card_id)
                    .await?;
                return Ok(None);
            }
        };

        if row.key() != *key {
            return Err(RemoteError::Decode(format!(
                "expected row for {}, got {}",
                key,
                row.key()
            )));
        }
        Ok(Some(row))
    }

    /// The failure has been surfaced; drop the flag unless a new intent
    /// already took the key over.
    fn clear_error_flag(&self, key: &CardKey) {
        let mut state = self.state();
        if state
            .overlay
            .get(key)
            .map_or(false, |entry| entry.has_error && !entry.is_loading)
        {
            state.overlay.remove(key);
        }
    }
}
