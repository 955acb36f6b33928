//! InMemoryRemoteStore - HashMap-backed authoritative backend for
//! development and testing.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{RemoteError, RemoteStore};
use crate::model::{CardId, CardKey, Collection, CollectionAttrs, CollectionCard, CollectionId};

#[derive(Default)]
struct Backend {
    collections: BTreeMap<CollectionId, Collection>,
    cards: BTreeMap<CardKey, CollectionCard>,
    next_id: i64,
    /// Backend-wide write counter; every written row takes the next value.
    version: u64,
}

impl Backend {
    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn require_collection(&self, id: CollectionId) -> Result<(), RemoteError> {
        if self.collections.contains_key(&id) {
            Ok(())
        } else {
            Err(RemoteError::NotFound(format!("collection {}", id)))
        }
    }

    fn set_quantity(
        &mut self,
        key: CardKey,
        quantity: u32,
    ) -> Result<CollectionCard, RemoteError> {
        self.require_collection(key.collection_id)?;
        let version = self.next_version();

        if quantity == 0 {
            let mut row = self
                .cards
                .remove(&key)
                .unwrap_or_else(|| CollectionCard::new(key.collection_id, key.card_id.clone(), 0));
            row.quantity = 0;
            row.version = version;
            return Ok(row);
        }

        let row = self
            .cards
            .entry(key.clone())
            .or_insert_with(|| CollectionCard::new(key.collection_id, key.card_id.clone(), 0));
        row.quantity = quantity;
        row.version = version;
        Ok(row.clone())
    }
}

/// Authoritative in-memory backend.
///
/// Clone-friendly via Arc: clones share the same storage, which is how tests
/// simulate writes made from another device.
#[derive(Clone)]
pub struct InMemoryRemoteStore {
    backend: Arc<RwLock<Backend>>,
    user_id: String,
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::with_user("local")
    }

    /// Create a store whose collections are owned by `user_id`.
    pub fn with_user(user_id: impl Into<String>) -> Self {
        Self {
            backend: Arc::new(RwLock::new(Backend {
                next_id: 1,
                ..Default::default()
            })),
            user_id: user_id.into(),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Backend>, RemoteError> {
        self.backend.read().map_err(|_| RemoteError::Server {
            status: 500,
            message: "backend lock poisoned".into(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Backend>, RemoteError> {
        self.backend.write().map_err(|_| RemoteError::Server {
            status: 500,
            message: "backend lock poisoned".into(),
        })
    }

    /// Insert a collection directly, bypassing validation.
    pub fn seed_collection(&self, name: &str) -> Result<Collection, RemoteError> {
        self.insert_collection(&CollectionAttrs::new(name))
    }

    /// Write a card row directly with an absolute quantity (0 deletes).
    pub fn seed_card(
        &self,
        collection_id: CollectionId,
        card_id: &str,
        quantity: u32,
    ) -> Result<CollectionCard, RemoteError> {
        self.write()?
            .set_quantity(CardKey::new(collection_id, card_id), quantity)
    }

    /// Current server row for a key.
    pub fn card(&self, collection_id: CollectionId, card_id: &str) -> Option<CollectionCard> {
        self.read()
            .ok()?
            .cards
            .get(&CardKey::new(collection_id, card_id))
            .cloned()
    }

    pub fn collection(&self, id: CollectionId) -> Option<Collection> {
        self.read().ok()?.collections.get(&id).cloned()
    }

    /// Latest version handed out by the backend.
    pub fn version(&self) -> u64 {
        self.read().map(|b| b.version).unwrap_or(0)
    }

    fn insert_collection(&self, attrs: &CollectionAttrs) -> Result<Collection, RemoteError> {
        let mut backend = self.write()?;
        let id = CollectionId(backend.next_id);
        backend.next_id += 1;
        let version = backend.next_version();
        let now = Utc::now();
        let collection = Collection {
            id,
            name: attrs.name.trim().to_string(),
            language: attrs.language.clone(),
            created_at: now,
            updated_at: now,
            user_id: self.user_id.clone(),
            version,
        };
        backend.collections.insert(id, collection.clone());
        Ok(collection)
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn list_collections(&self) -> Result<Vec<Collection>, RemoteError> {
        Ok(self.read()?.collections.values().cloned().collect())
    }

    async fn list_collection_cards(&self) -> Result<Vec<CollectionCard>, RemoteError> {
        Ok(self.read()?.cards.values().cloned().collect())
    }

    async fn create_collection_card(
        &self,
        collection_id: CollectionId,
        card_id: &CardId,
    ) -> Result<CollectionCard, RemoteError> {
        let mut backend = self.write()?;
        let key = CardKey::new(collection_id, card_id.clone());
        let quantity = backend.cards.get(&key).map(|row| row.quantity).unwrap_or(0);
        backend.set_quantity(key, quantity.saturating_add(1))
    }

    async fn update_collection_card_quantity(
        &self,
        collection_id: CollectionId,
        card_id: &CardId,
        quantity: u32,
    ) -> Result<CollectionCard, RemoteError> {
        self.write()?
            .set_quantity(CardKey::new(collection_id, card_id.clone()), quantity)
    }

    async fn delete_collection_card(
        &self,
        collection_id: CollectionId,
        card_id: &CardId,
    ) -> Result<(), RemoteError> {
        let mut backend = self.write()?;
        if backend
            .cards
            .remove(&CardKey::new(collection_id, card_id.clone()))
            .is_some()
        {
            backend.next_version();
        }
        Ok(())
    }

    async fn create_collection(&self, attrs: &CollectionAttrs) -> Result<Collection, RemoteError> {
        self.insert_collection(attrs)
    }

    async fn update_collection(
        &self,
        id: CollectionId,
        attrs: &CollectionAttrs,
    ) -> Result<Collection, RemoteError> {
        let mut backend = self.write()?;
        backend.require_collection(id)?;
        let version = backend.next_version();
        let collection = backend
            .collections
            .get_mut(&id)
            .ok_or_else(|| RemoteError::NotFound(format!("collection {}", id)))?;
        collection.name = attrs.name.trim().to_string();
        collection.language = attrs.language.clone();
        collection.updated_at = Utc::now();
        collection.version = version;
        Ok(collection.clone())
    }

    async fn delete_collection(&self, id: CollectionId) -> Result<(), RemoteError> {
        let mut backend = self.write()?;
        if backend.collections.remove(&id).is_some() {
            backend.cards.retain(|key, _| key.collection_id != id);
            backend.next_version();
        }
        Ok(())
    }
}
