use std::collections::HashMap;
use tracing::{debug, warn};

use microblog_core::error::Result;
use microblog_core::traits::{check_page, Indexable, RowStore, SearchIndex};
use microblog_core::types::EntityId;

/// One page of full rows in relevance order.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults<E> {
    pub items: Vec<E>,
    pub total: u64,
    pub page: usize,
    pub page_size: usize,
}

impl<E> SearchResults<E> {
    pub fn empty(page: usize, page_size: usize) -> Self {
        Self { items: Vec::new(), total: 0, page, page_size }
    }

    pub fn next_page(&self) -> Option<usize> {
        let shown = (self.page as u64).saturating_mul(self.page_size as u64);
        (self.total > shown).then_some(self.page + 1)
    }

    pub fn prev_page(&self) -> Option<usize> {
        (self.page > 1).then(|| self.page - 1)
    }
}

/// Query the index for `text`, then load the matching rows from `rows`
/// in the index's ranking order.
///
/// Nothing is fetched from the store when the index reports no matches.
/// Ids the store no longer has (a stale index entry) are skipped.
pub fn search<E, R, I>(rows: &R, index: &I, text: &str, page: usize, page_size: usize) -> Result<SearchResults<E>>
where
    E: Indexable,
    R: RowStore + ?Sized,
    I: SearchIndex + ?Sized,
{
    check_page(page, page_size)?;
    let hits = index.query(E::KIND, text, page, page_size)?;
    if hits.is_empty() {
        debug!(kind = %E::KIND, query = text, total = hits.total, "no matches");
        return Ok(SearchResults { total: hits.total, ..SearchResults::empty(page, page_size) });
    }
    let items = order_by_rank(rows.fetch_by_ids::<E>(&hits.ids)?, &hits.ids);
    if items.len() < hits.ids.len() {
        warn!(kind = %E::KIND, missing = hits.ids.len() - items.len(), "index returned ids absent from the store");
    }
    Ok(SearchResults { items, total: hits.total, page, page_size })
}

/// Reorder `fetched` to follow `ranked`. Ids with no fetched row are dropped.
pub fn order_by_rank<E: Indexable>(fetched: Vec<E>, ranked: &[EntityId]) -> Vec<E> {
    let mut by_id: HashMap<EntityId, E> = fetched.into_iter().map(|e| (e.id(), e)).collect();
    ranked.iter().filter_map(|id| by_id.remove(id)).collect()
}
