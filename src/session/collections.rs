use std::sync::Arc;

use super::CollectionSession;
use crate::error::{Result, SyncError};
use crate::model::{Collection, CollectionAttrs, CollectionId};
use crate::notify::{Label, Notification};
use crate::remote::RemoteStore;

impl<R: RemoteStore> CollectionSession<R> {
    /// Create a collection. Not optimistic: the collection appears once the
    /// server has assigned its id.
    pub async fn create_collection(&self, attrs: CollectionAttrs) -> Result<Arc<Collection>> {
        let attrs = self.validated(attrs)?;
        let generation = self.generation()?;

        let created = match self.inner.remote.create_collection(&attrs).await {
            Ok(created) => created,
            Err(err) => return Err(self.collection_failed("create", err.into()).await),
        };

        let collection = {
            let mut state = self.state();
            if state.closed || state.generation != generation {
                return Err(SyncError::SessionClosed);
            }
            state.ledger.record_collection(created.id);
            state.cache.put_collection(created)
        };
        tracing::info!(collection = %collection.id, name = %collection.name, "collection created");
        self.inner
            .notifier
            .notify(Notification::collection_saved(&collection.name, true));
        Ok(collection)
    }

    /// Rename a collection or change its language.
    pub async fn update_collection(
        &self,
        id: CollectionId,
        attrs: CollectionAttrs,
    ) -> Result<Arc<Collection>> {
        let attrs = self.validated(attrs)?;
        let generation = self.known_collection(id)?;

        let updated = match self.inner.remote.update_collection(id, &attrs).await {
            Ok(updated) => updated,
            Err(err) => return Err(self.collection_failed("update", err.into()).await),
        };

        let collection = {
            let mut state = self.state();
            if state.closed || state.generation != generation {
                return Err(SyncError::SessionClosed);
            }
            state.ledger.record_collection(id);
            state.cache.put_collection(updated)
        };
        tracing::info!(collection = %id, name = %collection.name, "collection updated");
        self.inner
            .notifier
            .notify(Notification::collection_saved(&collection.name, false));
        Ok(collection)
    }

    /// Delete a collection with every card in it.
    pub async fn delete_collection(&self, id: CollectionId) -> Result<()> {
        let generation = self.known_collection(id)?;

        if let Err(err) = self.inner.remote.delete_collection(id).await {
            return Err(self.collection_failed("delete", err.into()).await);
        }

        let label = {
            let mut guard = self.state();
            let state = &mut *guard;
            if state.closed || state.generation != generation {
                return Err(SyncError::SessionClosed);
            }
            let label = Label::collection(&state.cache, id);
            state.ledger.record_deleted_collection(id);
            state.cache.remove_collection(id);
            // Entries with a call in flight are settled by their driver, which
            // drops their rows.
            state
                .overlay
                .retain(|key, entry| key.collection_id != id || entry.is_loading);
            if state.active == Some(id) {
                state.active = None;
            }
            label
        };
        tracing::info!(collection = %id, "collection deleted");
        self.inner
            .notifier
            .notify(Notification::collection_deleted(&label));
        Ok(())
    }

    fn validated(&self, attrs: CollectionAttrs) -> Result<CollectionAttrs> {
        let name = attrs.trimmed_name().ok_or(SyncError::InvalidName)?.to_string();
        Ok(CollectionAttrs { name, ..attrs })
    }

    fn generation(&self) -> Result<u64> {
        let state = self.state();
        if state.closed {
            return Err(SyncError::SessionClosed);
        }
        Ok(state.generation)
    }

    fn known_collection(&self, id: CollectionId) -> Result<u64> {
        let state = self.state();
        if state.closed {
            return Err(SyncError::SessionClosed);
        }
        if state.cache.collection(id).is_none() {
            return Err(SyncError::UnknownCollection(id));
        }
        Ok(state.generation)
    }

    async fn collection_failed(&self, action: &str, err: SyncError) -> SyncError {
        tracing::warn!(action, error = %err, "collection change failed");
        self.inner
            .notifier
            .notify(Notification::collection_failed(action, &err));
        let conflict = err.remote().map_or(false, |remote| remote.is_conflict());
        if conflict && self.inner.config.refetch_on_conflict {
            if let Err(refresh_err) = self.refresh().await {
                tracing::warn!(error = %refresh_err, "refetch after conflict failed");
            }
        }
        err
    }
}
