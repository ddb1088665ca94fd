//! Front-matter extraction for Markdown pages.
//!
//! A page opens with optional metadata lines, then a setext H1 title:
//!
//! ```text
//! tag: howto
//! keyword=setup
//! Getting Started
//! ===
//! Hello world.
//! ```
//!
//! The parser walks the input two lines at a time (`upper`, `lower`):
//! 1. If `upper` is already an underline the page is malformed.
//! 2. While `lower` is not an underline, `upper` is a metadata line; shift
//!    `lower` into `upper` and read the next line.
//! 3. When `lower` is an underline, `upper` is the title and everything
//!    after the underline line is the body.
//!
//! Metadata lines look like `key: value` or `key=value`. Recognized keys are
//! case-sensitive and must be followed directly by the separator, so
//! `topical thing` is not a `topic` line. Unknown keys are ignored.

use thiserror::Error;

use super::types::{ParsedFrontMatter, SlugSet};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Longest line accepted before the page is treated as malformed.
pub const MAX_LINE_BYTES: usize = 4096;

const TOPIC_KEYS: &[&str] = &["tag", "topic", "category"];
const KEYWORD_KEYS: &[&str] = &["keyword", "keywords", "meta"];
const AUTHOR_KEYS: &[&str] = &["author", "authors"];

/// Structural failures that make a page unindexable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrontMatterError {
    #[error("document ended before line {line} (no title underline found)")]
    UnexpectedEof { line: usize },

    #[error("line {line} exceeds {MAX_LINE_BYTES} bytes")]
    LineTooLong { line: usize },

    #[error("first line is a title underline with no title above it")]
    UnderlineFirst,

    #[error("title on line {line} is empty")]
    EmptyTitle { line: usize },
}

/// Parse front-matter and title from an in-memory page.
pub fn parse(input: &[u8]) -> Result<ParsedFrontMatter, FrontMatterError> {
    let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
    let mut reader = LineReader::new(input);

    let mut upper = reader.next_line()?;
    if is_title_underline(upper) {
        return Err(FrontMatterError::UnderlineFirst);
    }
    let mut title_line = reader.line_no();
    let mut lower = reader.next_line()?;

    let mut metadata = Metadata::default();
    while !is_title_underline(lower) {
        metadata.process(upper);
        upper = lower;
        title_line = reader.line_no();
        lower = reader.next_line()?;
    }

    let title = String::from_utf8_lossy(upper).trim().to_string();
    if title.is_empty() {
        return Err(FrontMatterError::EmptyTitle { line: title_line });
    }

    Ok(ParsedFrontMatter {
        title,
        topics: metadata.topics,
        keywords: metadata.keywords,
        authors: metadata.authors,
        body: reader.rest().to_vec(),
    })
}

/// Check for a setext H1 underline: `^[ \t]*=+[ \t]*$`.
pub fn is_title_underline(line: &[u8]) -> bool {
    let start = line
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .unwrap_or(line.len());
    let rest = &line[start..];
    let equals = rest.iter().take_while(|&&b| b == b'=').count();
    equals > 0 && rest[equals..].iter().all(|&b| b == b' ' || b == b'\t')
}

/// Splits the input on `\n`, tracking line numbers.
struct LineReader<'a> {
    input: &'a [u8],
    pos: usize,
    line_no: usize,
}

impl<'a> LineReader<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line_no: 0,
        }
    }

    /// Next complete line without its terminator (and without a trailing `\r`).
    ///
    /// The last line of the input may lack a terminator.
    fn next_line(&mut self) -> Result<&'a [u8], FrontMatterError> {
        let line = self.line_no + 1;
        if self.pos >= self.input.len() {
            return Err(FrontMatterError::UnexpectedEof { line });
        }

        let rest = &self.input[self.pos..];
        let (raw, advance) = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        if raw.len() > MAX_LINE_BYTES {
            return Err(FrontMatterError::LineTooLong { line });
        }

        self.pos += advance;
        self.line_no = line;
        Ok(raw.strip_suffix(b"\r").unwrap_or(raw))
    }

    fn line_no(&self) -> usize {
        self.line_no
    }

    fn rest(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }
}

#[derive(Default)]
struct Metadata {
    topics: SlugSet,
    keywords: SlugSet,
    authors: SlugSet,
}

impl Metadata {
    fn process(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let groups = [
            (TOPIC_KEYS, &mut self.topics),
            (KEYWORD_KEYS, &mut self.keywords),
            (AUTHOR_KEYS, &mut self.authors),
        ];

        for (keys, target) in groups {
            for key in keys {
                if let Some(value) = metadata_value(&line, key) {
                    target.insert(value);
                }
            }
        }
    }
}

/// Value of `key` on a metadata line, or `None` if the line is not for `key`.
fn metadata_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line
        .trim_start_matches(|c: char| c == ' ' || c == '\t')
        .strip_prefix(key)?;
    let rest = rest.strip_prefix(|c: char| c == ':' || c == '=')?;
    Some(rest.trim_matches(|c: char| c.is_whitespace() || c == '=' || c == ':'))
}
