//! Core types for front-matter extraction and indexed pages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Normalize a metadata value into a slug.
///
/// Runs of spaces and tabs become a single `-`, and runs of `-` collapse
/// to one. Surrounding whitespace is dropped. Applying it twice gives the
/// same result as applying it once.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for ch in value.trim().chars() {
        let ch = if ch == ' ' || ch == '\t' { '-' } else { ch };
        if ch == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(ch);
    }
    slug
}

/// A deduplicated set of slugs.
///
/// Iteration order carries no meaning; it is sorted only so joined forms
/// are stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlugSet(BTreeSet<String>);

impl SlugSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slugify and insert a value. Empty slugs are dropped.
    ///
    /// Returns true if the slug was not already present.
    pub fn insert(&mut self, value: &str) -> bool {
        let slug = slugify(value);
        if slug.is_empty() {
            return false;
        }
        self.0.insert(slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.0.contains(slug)
    }

    /// First slug present in both sets, if any.
    pub fn first_shared<'a>(&'a self, other: &SlugSet) -> Option<&'a str> {
        self.0
            .iter()
            .find(|slug| other.contains(slug))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Space-joined form used for the index fields.
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(" ")
    }
}

impl<S: AsRef<str>> FromIterator<S> for SlugSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SlugSet::new();
        for value in iter {
            set.insert(value.as_ref());
        }
        set
    }
}

/// Front-matter extracted from a document, plus the remaining body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrontMatter {
    /// Line directly above the setext `===` underline. Never empty.
    pub title: String,
    pub topics: SlugSet,
    pub keywords: SlugSet,
    pub authors: SlugSet,
    /// Every byte after the underline line.
    pub body: Vec<u8>,
}

/// The record committed to the index, keyed by `uri_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Logical path; the sole key within an index.
    pub uri_path: String,
    pub title: String,
    /// Rendered plain text of the body.
    pub body: String,
    /// Space-joined topic slugs.
    pub topics: String,
    /// Space-joined keyword slugs.
    pub keywords: String,
    /// Space-joined author slugs.
    pub authors: String,
    /// File modification time (seconds since UNIX_EPOCH).
    pub modified: i64,
}
