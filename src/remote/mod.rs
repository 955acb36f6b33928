//! Remote store - the authoritative backend the session synchronizes with.
//!
//! The engine only consumes the `RemoteStore` trait. `InMemoryRemoteStore`
//! is a complete backend for development and tests; with the `http` feature
//! the same store can be served over REST and consumed with `HttpRemoteStore`.

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
mod http_client;
mod in_memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{CardId, Collection, CollectionAttrs, CollectionCard, CollectionId};

#[cfg(feature = "http")]
pub use http_client::HttpRemoteStore;
pub use in_memory::InMemoryRemoteStore;

/// Failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    /// The server answered with an error status.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The entity the call targeted no longer exists on the server.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// The server no longer has what local state assumes it has.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }

    /// Transient failures that are worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Network(_) | RemoteError::Timeout => true,
            RemoteError::Server { status, .. } => *status >= 500,
            RemoteError::NotFound(_) | RemoteError::Decode(_) => false,
        }
    }
}

/// Calls against the authoritative backend.
///
/// Card writes return the server's row after the write, which carries the
/// new `version`. Deletes are idempotent.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    async fn list_collections(&self) -> Result<Vec<Collection>, RemoteError>;

    /// Cards of every collection visible to the session.
    async fn list_collection_cards(&self) -> Result<Vec<CollectionCard>, RemoteError>;

    /// Create the row with quantity 1, or increment an existing row.
    async fn create_collection_card(
        &self,
        collection_id: CollectionId,
        card_id: &CardId,
    ) -> Result<CollectionCard, RemoteError>;

    async fn update_collection_card_quantity(
        &self,
        collection_id: CollectionId,
        card_id: &CardId,
        quantity: u32,
    ) -> Result<CollectionCard, RemoteError>;

    async fn delete_collection_card(
        &self,
        collection_id: CollectionId,
        card_id: &CardId,
    ) -> Result<(), RemoteError>;

    async fn create_collection(&self, attrs: &CollectionAttrs) -> Result<Collection, RemoteError>;

    async fn update_collection(
        &self,
        id: CollectionId,
        attrs: &CollectionAttrs,
    ) -> Result<Collection, RemoteError>;

    async fn delete_collection(&self, id: CollectionId) -> Result<(), RemoteError>;
}

#[async_trait]
impl<R: RemoteStore> RemoteStore for std::sync::Arc<R> {
    async fn list_collections(&self) -> Result<Vec<Collection>, RemoteError> {
        (**self).list_collections().await
    }

    async fn list_collection_cards(&self) -> Result<Vec<CollectionCard>, RemoteError> {
        (**self).list_collection_cards().await
    }

    async fn create_collection_card(
        &self,
        collection_id: CollectionId,
        card_id: &CardId,
    ) -> Result<CollectionCard, RemoteError> {
        (**self).create_collection_card(collection_id, card_id).await
    }

    async fn update_collection_card_quantity(
        &self,
        collection_id: CollectionId,
        card_id: &CardId,
        quantity: u32,
    ) -> Result<CollectionCard, RemoteError> {
        (**self)
            .update_collection_card_quantity(collection_id, card_id, quantity)
            .await
    }

    async fn delete_collection_card(
        &self,
        collection_id: CollectionId,
        card_id: &CardId,
    ) -> Result<(), RemoteError> {
        (**self).delete_collection_card(collection_id, card_id).await
    }

    async fn create_collection(&self, attrs: &CollectionAttrs) -> Result<Collection, RemoteError> {
        (**self).create_collection(attrs).await
    }

    async fn update_collection(
        &self,
        id: CollectionId,
        attrs: &CollectionAttrs,
    ) -> Result<Collection, RemoteError> {
        (**self).update_collection(id, attrs).await
    }

    async fn delete_collection(&self, id: CollectionId) -> Result<(), RemoteError> {
        (**self).delete_collection(id).await
    }
}
