//! Mutation coordinator - the per-key state machine behind every card
//! mutation.
//!
//! ```text
//! Idle --accept--> Pending --settle(Ok)--> Committed --> Cooling --> Idle
//!                     |  ^                     |
//!                     |  +----follow-up--------+   (coalesced delta left)
//!                     +--settle(Err)--> RolledBack --> Idle
//! ```
//!
//! Both halves are synchronous: `accept` runs when an intent arrives and
//! `settle` runs when the outstanding remote call resolves. The session owns
//! the asynchronous part in between.

mod accept;
mod settle;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{Result, SyncError};

pub(crate) use accept::{accept, Accepted};
pub(crate) use settle::{settle, Settled};

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Add,
    Remove,
    SetQuantity(i64),
}

/// The remote call carrying a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    /// Create the row or increment it by one.
    Increment,
    SetQuantity(u32),
    Delete,
}

/// Resolves once the remote call carrying an intent has settled.
#[derive(Debug)]
pub struct Settlement {
    rx: oneshot::Receiver<Result<()>>,
}

impl Settlement {
    pub(crate) fn channel() -> (oneshot::Sender<Result<()>>, Settlement) {
        let (tx, rx) = oneshot::channel();
        (tx, Settlement { rx })
    }
}

impl Future for Settlement {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(SyncError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Outcome of submitting an intent. The optimistic state is already
/// visible by the time this is returned.
#[derive(Debug)]
pub enum Intent {
    /// A remote call was issued for this intent.
    Dispatched(Settlement),
    /// Merged into the delta of a call already in flight for the key.
    Coalesced(Settlement),
    /// Absorbed by the cooldown that follows a commit. Nothing was sent.
    Debounced,
    /// The requested quantity is already the effective quantity.
    Unchanged,
}

impl Intent {
    /// Wait for the intent to settle. Debounced and unchanged intents are
    /// settled immediately.
    pub async fn settled(self) -> Result<()> {
        match self {
            Intent::Dispatched(settlement) | Intent::Coalesced(settlement) => settlement.await,
            Intent::Debounced | Intent::Unchanged => Ok(()),
        }
    }

    pub fn is_dispatched(&self) -> bool {
        matches!(self, Intent::Dispatched(_))
    }

    pub fn is_coalesced(&self) -> bool {
        matches!(self, Intent::Coalesced(_))
    }

    pub fn is_debounced(&self) -> bool {
        matches!(self, Intent::Debounced)
    }
}
