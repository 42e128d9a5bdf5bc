//! microblog-sync
//!
//! Keeps a search index in step with committed rows and answers searches
//! with full rows in ranking order.

pub mod changes;
pub mod dispatcher;
pub mod reindex;
pub mod translate;

pub use changes::PendingChangeSet;
pub use dispatcher::IndexSync;
pub use reindex::{reindex, ReindexStats};
pub use translate::{order_by_rank, search, SearchResults};

use std::sync::Arc;

use microblog_core::error::Result;
use microblog_core::traits::{Indexable, SearchIndex};
use microblog_store::{Session, Store};

/// A [`Store`] whose commits are mirrored into `I`.
pub struct SearchableStore<I: SearchIndex + ?Sized> {
    store: Arc<Store>,
    index: Arc<I>,
}

impl<I: SearchIndex + ?Sized + 'static> SearchableStore<I> {
    /// Register an [`IndexSync`] hook on `store` for `index`.
    pub fn new(store: Arc<Store>, index: Arc<I>) -> Self {
        store.register_hook(Arc::new(IndexSync::new(index.clone())));
        Self { store, index }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn begin(&self) -> Session<'_> {
        self.store.begin()
    }

    pub fn search<E: Indexable>(&self, text: &str, page: usize, page_size: usize) -> Result<SearchResults<E>> {
        search::<E, _, _>(self.store.as_ref(), self.index.as_ref(), text, page, page_size)
    }

    pub fn reindex<E: Indexable>(&self, batch_size: usize, on_batch: impl FnMut(usize)) -> Result<ReindexStats> {
        reindex::<E, _, _>(self.store.as_ref(), self.index.as_ref(), batch_size, on_batch)
    }
}
