use tracing::debug;

use microblog_core::error::Result;
use microblog_core::traits::SearchIndex;
use microblog_store::{CommitHook, TrackedChanges, TxnId, TxnSlot};

use crate::changes::PendingChangeSet;

/// Commit hook that mirrors indexable rows into a search index.
///
/// `before_commit` captures a [`PendingChangeSet`] into the transaction's slot;
/// `after_commit` replays it. The primary store is the source of truth, so a
/// failed replay is reported and left for the next write or a reindex.
pub struct IndexSync<I> {
    index: I,
}

impl<I: SearchIndex> IndexSync<I> {
    pub fn new(index: I) -> Self {
        Self { index }
    }
}

impl<I: SearchIndex> CommitHook for IndexSync<I> {
    fn name(&self) -> &str {
        "search-index"
    }

    fn before_commit(&self, txn: TxnId, changes: &TrackedChanges, slot: &mut TxnSlot) -> Result<()> {
        let pending = PendingChangeSet::capture(changes);
        debug!(txn, add = pending.add.len(), update = pending.update.len(), delete = pending.delete.len(), "captured index changes");
        if !pending.is_empty() {
            slot.put(pending);
        }
        Ok(())
    }

    fn after_commit(&self, txn: TxnId, slot: &mut TxnSlot) -> Result<()> {
        let Some(pending) = slot.take::<PendingChangeSet>() else { return Ok(()) };
        let ops = pending.into_ops();
        self.index.apply(&ops)?;
        debug!(txn, ops = ops.len(), "replayed index changes");
        Ok(())
    }
}
