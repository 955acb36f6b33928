use std::fmt;

use super::Notification;
use crate::cache::EntityCache;
use crate::error::SyncError;
use crate::model::{CardKey, CollectionId};
use crate::remote::RemoteError;

/// Human name of a collection, resolved from the cache when possible.
pub(crate) struct Label(String);

impl Label {
    pub(crate) fn collection(cache: &EntityCache, id: CollectionId) -> Self {
        match cache.collection(id) {
            Some(collection) => Label(format!("\"{}\"", collection.name)),
            None => Label(format!("collection {}", id)),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Notification {
    /// A card mutation chain committed; `before`/`after` are the settled
    /// quantities around it.
    pub(crate) fn card_committed(key: &CardKey, collection: &Label, before: u32, after: u32) -> Self {
        let message = if after == 0 {
            format!("Removed {} from {}", key.card_id, collection)
        } else if before == 0 {
            format!("Added {} to {}", key.card_id, collection)
        } else {
            format!("{} now has {} × {}", collection, after, key.card_id)
        };
        Notification::success(message).for_key(key.clone())
    }

    /// A card mutation failed and was rolled back.
    pub(crate) fn card_rolled_back(
        key: &CardKey,
        collection: &Label,
        delta: i64,
        error: &RemoteError,
    ) -> Self {
        let action = match delta.signum() {
            1 => format!("add {} to {}", key.card_id, collection),
            -1 => format!("remove {} from {}", key.card_id, collection),
            _ => format!("update {} in {}", key.card_id, collection),
        };
        let hint = if error.is_conflict() {
            "it no longer exists"
        } else if error.is_retryable() {
            "please try again"
        } else {
            "the change was reverted"
        };
        Notification::error(format!("Could not {}: {}", action, hint))
            .for_key(key.clone())
            .retryable(error.is_retryable())
    }

    pub(crate) fn collection_saved(name: &str, created: bool) -> Self {
        if created {
            Notification::success(format!("Created collection \"{}\"", name))
        } else {
            Notification::success(format!("Saved collection \"{}\"", name))
        }
    }

    pub(crate) fn collection_deleted(collection: &Label) -> Self {
        Notification::success(format!("Deleted {}", collection))
    }

    pub(crate) fn collection_failed(action: &str, error: &SyncError) -> Self {
        let retryable = error.remote().map(RemoteError::is_retryable).unwrap_or(false);
        Notification::error(format!("Could not {} collection: {}", action, error)).retryable(retryable)
    }
}
