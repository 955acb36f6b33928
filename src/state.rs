use crate::cache::EntityCache;
use crate::lock::KeyLockTable;
use crate::model::CollectionId;
use crate::overlay::Overlay;
use crate::reconcile::CommitLedger;

/// Everything a session mutates, kept behind one lock so that cache,
/// overlay and key locks always change together.
#[derive(Default)]
pub(crate) struct SyncState {
    pub cache: EntityCache,
    pub overlay: Overlay,
    pub locks: KeyLockTable,
    pub ledger: CommitLedger,
    pub active: Option<CollectionId>,
    /// Bumped by `close`; responses from an older generation are dropped.
    pub generation: u64,
    pub closed: bool,
}
