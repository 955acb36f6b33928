//! Optimistic synchronization engine for card collections.
//!
//! A [`CollectionSession`] mirrors the collections and collection cards of
//! one user in an [`EntityCache`], layers in-flight mutations over it as an
//! optimistic [`Overlay`], serializes remote calls per `(collection, card)`
//! key, rolls failed calls back, and reconciles with the server on mount,
//! focus and a polling interval.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod lock;
pub mod model;
pub mod notify;
pub mod overlay;
pub mod reconcile;
pub mod remote;
pub mod session;
mod state;

pub use cache::{EntityCache, LoadMode, LoadStats, Protection};
pub use config::SyncConfig;
pub use coordinator::{Intent, Mutation, RemoteOp, Settlement};
pub use error::{Result, SyncError};
pub use lock::{KeyLockTable, KeyState};
pub use model::{
    CardId, CardKey, CardPatch, Collection, CollectionAttrs, CollectionCard, CollectionId,
};
#[cfg(feature = "emitter")]
pub use notify::EmitterNotifier;
pub use notify::{BufferedNotifier, Level, Notification, NotificationSink, TracingNotifier};
pub use overlay::{effective_state, EffectiveCardState, OptimisticDelta, Overlay};
pub use reconcile::{CommitLedger, PollerStats, ReconcilePoller, RefreshTicket};
#[cfg(feature = "http")]
pub use remote::HttpRemoteStore;
pub use remote::{InMemoryRemoteStore, RemoteError, RemoteStore};
pub use session::{CollectionSession, SessionBuilder};

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
