use microblog_core::error::{Error, Result};
use microblog_core::traits::SearchIndex;
use microblog_core::types::{EntityId, EntityKind, IndexFields, SearchPage};

/// Stand-in used when search is switched off in configuration.
///
/// Writes are accepted and dropped. Queries fail with `SearchUnavailable`
/// so callers never mistake a disabled backend for an empty result.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledIndex;

impl SearchIndex for DisabledIndex {
    fn upsert(&self, _kind: EntityKind, _id: EntityId, _fields: &IndexFields) -> Result<()> { Ok(()) }

    fn remove(&self, _kind: EntityKind, _id: EntityId) -> Result<()> { Ok(()) }

    fn query(&self, _kind: EntityKind, _text: &str, _page: usize, _page_size: usize) -> Result<SearchPage> {
        Err(Error::SearchUnavailable("search is disabled".to_string()))
    }
}
