//! microblog-text
//!
//! Tantivy-backed full-text index for microblog records. See `index` for the
//! write path and `search` for ranked queries.

pub mod disabled;
pub mod index;
pub mod search;
pub mod tantivy_utils;

pub use disabled::DisabledIndex;
pub use index::TantivySearchIndex;

use std::sync::Arc;

use microblog_core::config::Config;
use microblog_core::traits::SearchIndex;

/// Build the index described by the `search.*` settings.
pub fn open_index(config: &Config) -> anyhow::Result<Arc<dyn SearchIndex>> {
    let settings = config.settings()?.search;
    if !settings.enabled {
        tracing::info!("search disabled; index writes are dropped");
        return Ok(Arc::new(DisabledIndex));
    }
    let index = match settings.index_dir.as_deref() {
        Some(dir) => TantivySearchIndex::open(&config.resolve(dir), settings.writer_heap_bytes)?,
        None => TantivySearchIndex::in_memory()?,
    };
    Ok(Arc::new(index))
}
