use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{Entity, EntityId, EntityKind, EntityRef, IndexDoc, IndexFields, IndexOp, SearchPage};

/// A row type persisted by the primary store.
pub trait Record: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;
    fn set_id(&mut self, id: EntityId);
    fn into_entity(self) -> Entity;
    fn from_entity(entity: Entity) -> Option<Self>;

    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(Self::KIND, self.id())
    }
}

/// Opt-in marker for records mirrored into the search index.
///
/// `SEARCHABLE` names the fields whose text feeds the index.
pub trait Indexable: Record {
    const SEARCHABLE: &'static [&'static str];

    fn field(&self, name: &str) -> Option<&str>;

    fn searchable_fields(&self) -> IndexFields {
        Self::SEARCHABLE
            .iter()
            .filter_map(|name| self.field(name).map(|v| ((*name).to_string(), v.to_string())))
            .collect()
    }

    fn index_doc(&self) -> IndexDoc {
        IndexDoc { entity: self.entity_ref(), fields: self.searchable_fields() }
    }
}

/// Full-text store keyed by (kind, id).
///
/// `upsert` and `remove` are idempotent. `query` pages are 1-indexed and
/// return `SearchPage::empty()` for zero matches; a backend that cannot answer
/// must fail with `Error::SearchUnavailable` instead.
pub trait SearchIndex: Send + Sync {
    fn upsert(&self, kind: EntityKind, id: EntityId, fields: &IndexFields) -> Result<()>;
    fn remove(&self, kind: EntityKind, id: EntityId) -> Result<()>;
    fn query(&self, kind: EntityKind, text: &str, page: usize, page_size: usize) -> Result<SearchPage>;

    /// Apply a batch of writes in order. Backends with costly commits should
    /// override this to commit once.
    fn apply(&self, ops: &[IndexOp]) -> Result<()> {
        for op in ops {
            match op {
                IndexOp::Upsert(doc) => self.upsert(doc.entity.kind, doc.entity.id, &doc.fields)?,
                IndexOp::Remove(entity) => self.remove(entity.kind, entity.id)?,
            }
        }
        Ok(())
    }
}

impl<I: SearchIndex + ?Sized> SearchIndex for Arc<I> {
    fn upsert(&self, kind: EntityKind, id: EntityId, fields: &IndexFields) -> Result<()> { (**self).upsert(kind, id, fields) }
    fn remove(&self, kind: EntityKind, id: EntityId) -> Result<()> { (**self).remove(kind, id) }
    fn query(&self, kind: EntityKind, text: &str, page: usize, page_size: usize) -> Result<SearchPage> { (**self).query(kind, text, page, page_size) }
    fn apply(&self, ops: &[IndexOp]) -> Result<()> { (**self).apply(ops) }
}

/// Read side of the primary store used by search and reindexing.
pub trait RowStore: Send + Sync {
    /// Rows whose id is in `ids`, in the store's own order. Unknown ids are skipped.
    fn fetch_by_ids<E: Record>(&self, ids: &[EntityId]) -> Result<Vec<E>>;

    /// Every committed row of type `E`.
    fn scan<E: Record>(&self) -> Result<Vec<E>>;
}

impl<R: RowStore + ?Sized> RowStore for Arc<R> {
    fn fetch_by_ids<E: Record>(&self, ids: &[EntityId]) -> Result<Vec<E>> { (**self).fetch_by_ids(ids) }
    fn scan<E: Record>(&self) -> Result<Vec<E>> { (**self).scan() }
}

/// Reject page 0 and empty pages before they reach a backend.
pub fn check_page(page: usize, page_size: usize) -> Result<()> {
    if page == 0 {
        return Err(Error::InvalidQuery("page numbers start at 1".to_string()));
    }
    if page_size == 0 {
        return Err(Error::InvalidQuery("page size must be positive".to_string()));
    }
    Ok(())
}
