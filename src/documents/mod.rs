//! Markdown page processing for the search index.
//!
//! This module provides:
//! - Front-matter extraction (title, topics, keywords, authors)
//! - Plain-text rendering of page bodies
//! - Assembly of index records with restricted-topic filtering

pub mod builder;
pub mod frontmatter;
pub mod render;
pub mod types;

pub use builder::{BuildError, BuildOutcome, DocumentBuilder};
pub use frontmatter::{FrontMatterError, parse};
pub use render::{PlainTextRenderer, Renderer};
pub use types::{IndexedDocument, ParsedFrontMatter, SlugSet, slugify};
