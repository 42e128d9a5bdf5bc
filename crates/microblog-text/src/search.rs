use tantivy::collector::{Count, DocSetCollector, TopDocs};
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{TantivyDocument, Term};
use tracing::debug;

use microblog_core::error::{Error, Result};
use microblog_core::traits::check_page;
use microblog_core::types::{EntityId, EntityKind, EntityRef, IndexFields, SearchPage};

use crate::index::TantivySearchIndex;

fn unavailable(e: impl std::fmt::Display) -> Error { Error::SearchUnavailable(e.to_string()) }

impl TantivySearchIndex {
	fn kind_filter(&self, kind: EntityKind) -> Box<dyn Query> {
		Box::new(TermQuery::new(Term::from_field_text(self.fields.kind, kind.as_str()), IndexRecordOption::Basic))
	}

	/// Rank `kind` documents against `text` and return one page of ids plus the match count.
	///
	/// The expression is parsed leniently: malformed syntax degrades to the
	/// terms that could be parsed rather than failing the search.
	pub(crate) fn ranked_ids(&self, kind: EntityKind, text: &str, page: usize, page_size: usize) -> Result<SearchPage> {
		check_page(page, page_size)?;
		let parser = QueryParser::for_index(&self.index, vec![self.fields.text]);
		let (parsed, errors) = parser.parse_query_lenient(text);
		if !errors.is_empty() { debug!(query = text, errors = errors.len(), "query parsed leniently"); }
		let query = BooleanQuery::new(vec![(Occur::Must, parsed), (Occur::Must, self.kind_filter(kind))]);

		let searcher = self.reader.searcher();
		let total = searcher.search(&query, &Count).map_err(unavailable)?;
		// TopDocs sizes its heap from offset + limit, so both stay within the match count.
		let offset = match (page - 1).checked_mul(page_size) {
			Some(offset) if offset < total => offset,
			_ => return Ok(SearchPage { ids: Vec::new(), total: total as u64 }),
		};
		let limit = page_size.min(total - offset);
		let top_docs = searcher.search(&query, &TopDocs::with_limit(limit).and_offset(offset)).map_err(unavailable)?;
		let mut ids = Vec::with_capacity(top_docs.len());
		for (_score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(unavailable)?;
			match doc.get_first(self.fields.id).and_then(|v| v.as_u64()) {
				Some(id) => ids.push(id),
				None => return Err(unavailable(format!("document {addr:?} has no id"))),
			}
		}
		Ok(SearchPage { ids, total: total as u64 })
	}

	/// Stored fields of one entry, or `None` when the entry is absent.
	pub fn entry(&self, entity: EntityRef) -> Result<Option<IndexFields>> {
		let searcher = self.reader.searcher();
		let query = TermQuery::new(Term::from_field_text(self.fields.key, &entity.key()), IndexRecordOption::Basic);
		let top = searcher.search(&query, &TopDocs::with_limit(1)).map_err(unavailable)?;
		let Some((_, addr)) = top.into_iter().next() else { return Ok(None) };
		let doc: TantivyDocument = searcher.doc(addr).map_err(unavailable)?;
		let json = doc.get_first(self.fields.fields).and_then(|v| v.as_str()).unwrap_or("{}");
		Ok(Some(serde_json::from_str(json)?))
	}

	/// Every indexed id of `kind`, ascending.
	pub fn ids(&self, kind: EntityKind) -> Result<Vec<EntityId>> {
		let searcher = self.reader.searcher();
		let addrs = searcher.search(self.kind_filter(kind).as_ref(), &DocSetCollector).map_err(unavailable)?;
		let mut ids = Vec::with_capacity(addrs.len());
		for addr in addrs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(unavailable)?;
			if let Some(id) = doc.get_first(self.fields.id).and_then(|v| v.as_u64()) { ids.push(id); }
		}
		ids.sort_unstable();
		Ok(ids)
	}

	/// Live documents across all kinds.
	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }
}
