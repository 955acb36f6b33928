//! Reconciliation - keeping the cache eventually consistent with the server.
//!
//! The ledger decides which keys a refresh may overwrite; the poller decides
//! when refreshes happen.

mod ledger;
mod poller;

pub use ledger::{CommitLedger, RefreshTicket};
pub use poller::{PollerStats, ReconcilePoller};
