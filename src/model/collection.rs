use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CollectionId;

/// A named grouping of cards owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    #[serde(default)]
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: String,
    /// Server-side row version, bumped on every write.
    #[serde(default)]
    pub version: u64,
}

impl Collection {
    /// True when `self` should win over `other` for the same id.
    pub(crate) fn supersedes(&self, other: &Collection) -> bool {
        if self.version != other.version {
            return self.version > other.version;
        }
        self.updated_at >= other.updated_at
    }
}

/// Client-side attributes of a collection that has no id yet (create), or a
/// rename/update payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollectionAttrs {
    pub name: String,
    #[serde(default)]
    pub language: String,
}

impl CollectionAttrs {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: String::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Name with surrounding whitespace removed; `None` when nothing is left.
    pub fn trimmed_name(&self) -> Option<&str> {
        let name = self.name.trim();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}
