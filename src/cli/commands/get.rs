//! Get command - print one stored record.

use anyhow::{Context, Result, anyhow};

use crate::config::Settings;
use crate::storage::TantivyStore;

/// Run get command.
pub fn run(config: &Settings, index: &str, uri_path: &str, json: bool) -> Result<()> {
    let section = config
        .index(index)
        .ok_or_else(|| anyhow!("No index named '{index}' in settings"))?;

    let store = TantivyStore::new(&section.path);
    let doc = store
        .get(uri_path)
        .with_context(|| format!("Cannot read index '{index}'"))?
        .ok_or_else(|| anyhow!("No document stored under {uri_path}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    let modified = chrono::DateTime::from_timestamp(doc.modified, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| doc.modified.to_string());

    println!("path:     {}", doc.uri_path);
    println!("title:    {}", doc.title);
    println!("topics:   {}", doc.topics);
    println!("keywords: {}", doc.keywords);
    println!("authors:  {}", doc.authors);
    println!("modified: {modified}");
    println!("{}", "-".repeat(50));
    println!("{}", doc.body);
    Ok(())
}
