use tracing::info;

use microblog_core::error::{Error, Result};
use microblog_core::traits::{Indexable, RowStore, SearchIndex};
use microblog_core::types::{EntityKind, IndexOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReindexStats {
    pub kind: EntityKind,
    pub indexed: usize,
    pub batches: usize,
}

/// Upsert every committed row of `E` into the index, `batch_size` rows per write.
///
/// Idempotent, and safe to run beside normal traffic. A row deleted after the
/// sweep read it can come back into the index until its delete is replayed again.
pub fn reindex<E, R, I>(rows: &R, index: &I, batch_size: usize, mut on_batch: impl FnMut(usize)) -> Result<ReindexStats>
where
    E: Indexable,
    R: RowStore + ?Sized,
    I: SearchIndex + ?Sized,
{
    if batch_size == 0 {
        return Err(Error::InvalidQuery("reindex batch size must be positive".to_string()));
    }
    let records = rows.scan::<E>()?;
    let mut stats = ReindexStats { kind: E::KIND, indexed: 0, batches: 0 };
    for chunk in records.chunks(batch_size) {
        let ops: Vec<IndexOp> = chunk.iter().map(|r| IndexOp::Upsert(r.index_doc())).collect();
        index.apply(&ops)?;
        stats.indexed += ops.len();
        stats.batches += 1;
        on_batch(ops.len());
    }
    info!(kind = %E::KIND, indexed = stats.indexed, batches = stats.batches, "reindex complete");
    Ok(stats)
}
