use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const TEXT_TOKENIZER: &str = "text_with_stopwords";

/// Field handles resolved once per opened index.
#[derive(Debug, Clone, Copy)]
pub struct SchemaFields {
	/// `"<kind>:<id>"`, untokenized; the delete-by-term handle.
	pub key: Field,
	pub kind: Field,
	pub id: Field,
	/// Tokenized text of every searchable field.
	pub text: Field,
	/// Stored JSON copy of the denormalized fields.
	pub fields: Field,
}

impl SchemaFields {
	pub fn resolve(schema: &Schema) -> tantivy::Result<Self> {
		Ok(Self {
			key: schema.get_field("key")?,
			kind: schema.get_field("kind")?,
			id: schema.get_field("id")?,
			text: schema.get_field("text")?,
			fields: schema.get_field("fields")?,
		})
	}
}

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("key", STRING);
	schema_builder.add_text_field("kind", STRING | STORED);
	schema_builder.add_u64_field("id", INDEXED | STORED | FAST);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TEXT_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	schema_builder.add_text_field("text", text_options);
	schema_builder.add_text_field("fields", STORED);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(TEXT_TOKENIZER, tokenizer);
}
