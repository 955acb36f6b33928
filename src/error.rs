//! Error types for the synchronization engine.

use thiserror::Error;

use crate::model::{CardKey, CollectionId};
use crate::remote::RemoteError;

/// Errors reported to callers of the session.
///
/// User-input errors are returned synchronously before any state changes.
/// Remote failures arrive through a settlement after the key was rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("no active collection selected")]
    NoActiveCollection,

    #[error("unknown collection: {0}")]
    UnknownCollection(CollectionId),

    #[error("a mutation is already pending for {0}, try again")]
    AlreadyPending(CardKey),

    #[error("{0} is not in the collection")]
    QuantityUnderflow(CardKey),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    #[error("collection name must not be empty")]
    InvalidName,

    #[error("remote call failed: {0}")]
    RemoteCallFailed(#[from] RemoteError),

    #[error("session closed")]
    SessionClosed,

    #[error("mutation abandoned before it settled")]
    Abandoned,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// User-input errors never reach the network and leave optimistic state
    /// untouched.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SyncError::NoActiveCollection
                | SyncError::UnknownCollection(_)
                | SyncError::AlreadyPending(_)
                | SyncError::QuantityUnderflow(_)
                | SyncError::InvalidQuantity(_)
                | SyncError::InvalidName
        )
    }

    /// The remote cause, if this error came from the remote store.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            SyncError::RemoteCallFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Config(err.to_string())
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SyncError>;
