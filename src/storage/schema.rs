//! Tantivy schema for indexed pages.
//!
//! `path` is an exact-match field so it can serve as the delete key; every
//! other text field goes through the configured analyzer.

use tantivy::schema::{
    DateOptions, Field, IndexRecordOption, STORED, STRING, Schema, SchemaBuilder,
    TextFieldIndexing, TextOptions,
};

pub const FIELD_TITLE: &str = "title";
pub const FIELD_PATH: &str = "path";
pub const FIELD_BODY: &str = "body";
pub const FIELD_TOPIC: &str = "topic";
pub const FIELD_KEYWORD: &str = "keyword";
pub const FIELD_AUTHOR: &str = "author";
pub const FIELD_MODIFIED: &str = "modified";

/// Schema fields for page storage.
#[derive(Debug, Clone, Copy)]
pub struct PageSchema {
    pub title: Field,

    /// Logical URI path, the unique key.
    pub path: Field,

    /// Rendered plain-text body.
    pub body: Field,

    /// Space-joined topic slugs.
    pub topic: Field,

    /// Space-joined keyword slugs.
    pub keyword: Field,

    /// Space-joined author slugs.
    pub author: Field,

    /// File modification time.
    pub modified: Field,
}

impl PageSchema {
    /// Build the page schema using `analyzer` as the tokenizer for text fields.
    pub fn build(analyzer: &str) -> (Schema, Self) {
        let mut builder = SchemaBuilder::default();

        let text_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer(analyzer)
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();

        let title = builder.add_text_field(FIELD_TITLE, text_options.clone());
        let path = builder.add_text_field(FIELD_PATH, STRING | STORED);
        let body = builder.add_text_field(FIELD_BODY, text_options.clone());
        let topic = builder.add_text_field(FIELD_TOPIC, text_options.clone());
        let keyword = builder.add_text_field(FIELD_KEYWORD, text_options.clone());
        let author = builder.add_text_field(FIELD_AUTHOR, text_options);

        let date_options = DateOptions::default()
            .set_indexed()
            .set_stored()
            .set_fast();
        let modified = builder.add_date_field(FIELD_MODIFIED, date_options);

        let schema = builder.build();

        let page_schema = Self {
            title,
            path,
            body,
            topic,
            keyword,
            author,
            modified,
        };

        (schema, page_schema)
    }

    /// Resolve fields from an existing index schema.
    ///
    /// Returns the name of the first missing field on failure.
    pub fn from_schema(schema: &Schema) -> Result<Self, &'static str> {
        let field = |name: &'static str| schema.get_field(name).map_err(|_| name);

        Ok(Self {
            title: field(FIELD_TITLE)?,
            path: field(FIELD_PATH)?,
            body: field(FIELD_BODY)?,
            topic: field(FIELD_TOPIC)?,
            keyword: field(FIELD_KEYWORD)?,
            author: field(FIELD_AUTHOR)?,
            modified: field(FIELD_MODIFIED)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_build() {
        let (schema, _fields) = PageSchema::build("default");

        for name in [
            FIELD_TITLE,
            FIELD_PATH,
            FIELD_BODY,
            FIELD_TOPIC,
            FIELD_KEYWORD,
            FIELD_AUTHOR,
            FIELD_MODIFIED,
        ] {
            assert!(schema.get_field(name).is_ok(), "missing {name}");
        }
        assert_eq!(schema.fields().count(), 7);
    }

    #[test]
    fn test_from_schema_resolves_fields() {
        let (schema, built) = PageSchema::build("en_stem");
        let resolved = PageSchema::from_schema(&schema).unwrap();
        assert_eq!(resolved.path, built.path);
        assert_eq!(resolved.modified, built.modified);

        let mut builder = SchemaBuilder::default();
        builder.add_text_field(FIELD_TITLE, STRING | STORED);
        let partial = builder.build();
        assert_eq!(PageSchema::from_schema(&partial).unwrap_err(), FIELD_PATH);
    }
}
