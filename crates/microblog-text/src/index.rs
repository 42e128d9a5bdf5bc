use parking_lot::Mutex;
use std::path::Path;
use tantivy::directory::MmapDirectory;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, warn};

use microblog_core::error::{Error, Result};
use microblog_core::traits::SearchIndex;
use microblog_core::types::{EntityId, EntityKind, EntityRef, IndexDoc, IndexFields, IndexOp, SearchPage};

use crate::tantivy_utils::{build_schema, register_tokenizer, SchemaFields};

pub const DEFAULT_WRITER_HEAP_BYTES: usize = 50_000_000;

/// Tantivy-backed search index. One document per (kind, id).
pub struct TantivySearchIndex {
	pub(crate) index: Index,
	pub(crate) reader: IndexReader,
	writer: Mutex<IndexWriter>,
	pub(crate) fields: SchemaFields,
}

pub(crate) fn index_err(e: impl std::fmt::Display) -> Error { Error::Index(e.to_string()) }

impl TantivySearchIndex {
	/// Open the index stored in `index_dir`, creating it when missing.
	pub fn open(index_dir: &Path, writer_heap_bytes: usize) -> Result<Self> {
		std::fs::create_dir_all(index_dir)?;
		let directory = MmapDirectory::open(index_dir).map_err(index_err)?;
		let index = Index::open_or_create(directory, build_schema()).map_err(index_err)?;
		debug!(dir = %index_dir.display(), "opened search index");
		Self::from_index(index, writer_heap_bytes)
	}

	pub fn in_memory() -> Result<Self> {
		Self::from_index(Index::create_in_ram(build_schema()), DEFAULT_WRITER_HEAP_BYTES)
	}

	fn from_index(index: Index, writer_heap_bytes: usize) -> Result<Self> {
		register_tokenizer(&index);
		let fields = SchemaFields::resolve(&index.schema()).map_err(index_err)?;
		// One indexing thread: each commit lands as a single segment.
		let writer = index.writer_with_num_threads(1, writer_heap_bytes).map_err(index_err)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(index_err)?;
		Ok(Self { index, reader, writer: Mutex::new(writer), fields })
	}

	fn to_document(&self, doc: &IndexDoc) -> Result<TantivyDocument> {
		let mut document = TantivyDocument::default();
		document.add_text(self.fields.key, doc.entity.key());
		document.add_text(self.fields.kind, doc.entity.kind.as_str());
		document.add_u64(self.fields.id, doc.entity.id);
		for value in doc.fields.values() { document.add_text(self.fields.text, value); }
		document.add_text(self.fields.fields, serde_json::to_string(&doc.fields)?);
		Ok(document)
	}

	fn key_term(&self, entity: &EntityRef) -> Term { Term::from_field_text(self.fields.key, &entity.key()) }

	/// Stage every op, then commit once. A failed batch is rolled back as a whole.
	fn write_batch(&self, ops: &[IndexOp]) -> Result<()> {
		if ops.is_empty() { return Ok(()); }
		let mut writer = self.writer.lock();
		let staged: Result<()> = ops.iter().try_for_each(|op| {
			writer.delete_term(self.key_term(&op.entity()));
			if let IndexOp::Upsert(doc) = op { writer.add_document(self.to_document(doc)?).map_err(index_err)?; }
			Ok(())
		});
		let committed = staged.and_then(|()| writer.commit().map(|_| ()).map_err(index_err));
		if let Err(e) = committed {
			if let Err(rollback_err) = writer.rollback() { warn!(error = %rollback_err, "index rollback failed"); }
			return Err(e);
		}
		drop(writer);
		self.reader.reload().map_err(index_err)?;
		debug!(ops = ops.len(), "committed index batch");
		Ok(())
	}
}

impl SearchIndex for TantivySearchIndex {
	fn upsert(&self, kind: EntityKind, id: EntityId, fields: &IndexFields) -> Result<()> {
		let doc = IndexDoc { entity: EntityRef::new(kind, id), fields: fields.clone() };
		self.write_batch(&[IndexOp::Upsert(doc)])
	}

	fn remove(&self, kind: EntityKind, id: EntityId) -> Result<()> {
		self.write_batch(&[IndexOp::Remove(EntityRef::new(kind, id))])
	}

	fn query(&self, kind: EntityKind, text: &str, page: usize, page_size: usize) -> Result<SearchPage> {
		self.ranked_ids(kind, text, page, page_size)
	}

	fn apply(&self, ops: &[IndexOp]) -> Result<()> { self.write_batch(ops) }
}
