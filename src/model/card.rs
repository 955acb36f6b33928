use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CardId, CardKey, CollectionId};

/// Membership of one card in one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionCard {
    pub collection_id: CollectionId,
    pub card_id: CardId,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
    /// Display data captured when the card was added. Never authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_data: Option<Value>,
    /// Server-side row version, bumped on every write.
    #[serde(default)]
    pub version: u64,
}

impl CollectionCard {
    pub fn new(collection_id: CollectionId, card_id: impl Into<CardId>, quantity: u32) -> Self {
        Self {
            collection_id,
            card_id: card_id.into(),
            quantity,
            added_at: Utc::now(),
            card_data: None,
            version: 0,
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn key(&self) -> CardKey {
        CardKey::new(self.collection_id, self.card_id.clone())
    }

    /// True when `self` should win over `other` for the same key.
    pub(crate) fn supersedes(&self, other: &CollectionCard) -> bool {
        if self.version != other.version {
            return self.version > other.version;
        }
        self.added_at >= other.added_at
    }
}

/// Partial update of a card row. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardPatch {
    pub quantity: Option<u32>,
    pub added_at: Option<DateTime<Utc>>,
    pub card_data: Option<Value>,
    pub version: Option<u64>,
}

impl CardPatch {
    pub fn quantity(quantity: u32) -> Self {
        Self {
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    pub fn with_card_data(mut self, data: Value) -> Self {
        self.card_data = Some(data);
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Apply the patch to an existing row, or build a fresh row for `key`.
    pub(crate) fn apply(self, key: &CardKey, existing: Option<&CollectionCard>) -> CollectionCard {
        let mut row = match existing {
            Some(row) => row.clone(),
            None => CollectionCard::new(key.collection_id, key.card_id.clone(), 0),
        };
        if let Some(quantity) = self.quantity {
            row.quantity = quantity;
        }
        if let Some(added_at) = self.added_at {
            row.added_at = added_at;
        }
        if let Some(data) = self.card_data {
            row.card_data = Some(data);
        }
        if let Some(version) = self.version {
            row.version = version;
        }
        row
    }
}
