//! Parse command - show what the builder would see in one file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::documents::{PlainTextRenderer, Renderer, frontmatter};

#[derive(Serialize)]
struct ParsedView<'a> {
    title: &'a str,
    topics: Vec<&'a str>,
    keywords: Vec<&'a str>,
    authors: Vec<&'a str>,
    body: String,
}

/// Run parse command on a single file.
pub fn run(file_path: &Path, json: bool) -> Result<()> {
    let bytes = std::fs::read(file_path)
        .with_context(|| format!("Cannot read {}", file_path.display()))?;
    let parsed = frontmatter::parse(&bytes)
        .with_context(|| format!("Invalid front matter in {}", file_path.display()))?;

    let view = ParsedView {
        title: &parsed.title,
        topics: parsed.topics.iter().collect(),
        keywords: parsed.keywords.iter().collect(),
        authors: parsed.authors.iter().collect(),
        body: PlainTextRenderer::new().render(&parsed.body),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("title:    {}", view.title);
    println!("topics:   {}", view.topics.join(", "));
    println!("keywords: {}", view.keywords.join(", "));
    println!("authors:  {}", view.authors.join(", "));
    println!("{}", "-".repeat(50));
    println!("{}", view.body);
    Ok(())
}
