//! Models - the two entity types mirrored by the cache, and the key that
//! identifies one unit of mutation concurrency.
//!
//! ## Example
//!
//! ```ignore
//! use collection_sync::{CardKey, CollectionId};
//!
//! let key = CardKey::new(CollectionId(5), "card-1");
//! assert_eq!(key.to_string(), "5:card-1");
//! ```

mod card;
mod collection;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use card::{CardPatch, CollectionCard};
pub use collection::{Collection, CollectionAttrs};

/// Server-assigned identifier of a collection. Immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(pub i64);

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CollectionId {
    fn from(id: i64) -> Self {
        CollectionId(id)
    }
}

/// Opaque identifier of a catalog card, defined outside this system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub String);

impl CardId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        CardId(id.to_string())
    }
}

impl From<String> for CardId {
    fn from(id: String) -> Self {
        CardId(id)
    }
}

impl From<&String> for CardId {
    fn from(id: &String) -> Self {
        CardId(id.clone())
    }
}

impl From<&CardId> for CardId {
    fn from(id: &CardId) -> Self {
        id.clone()
    }
}

/// The mutation key: one card inside one collection.
///
/// At most one remote call is outstanding per key, and the cache holds at
/// most one row per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardKey {
    pub collection_id: CollectionId,
    pub card_id: CardId,
}

impl CardKey {
    pub fn new(collection_id: CollectionId, card_id: impl Into<CardId>) -> Self {
        Self {
            collection_id,
            card_id: card_id.into(),
        }
    }
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection_id, self.card_id)
    }
}
