//! Index command - walk every configured directory once.

use std::sync::Arc;

use anyhow::{Context, Result, bail};

use crate::config::{IndexSection, Settings};
use crate::documents::{DocumentBuilder, PlainTextRenderer};
use crate::indexing::{DirectoryWalker, SyncPipeline, WalkStats};
use crate::storage::{IndexMutator, MemoryIndex, TantivyStore};

/// Run the index command for all sections, or only the one named.
///
/// With `dry_run` the pages go to an in-memory index and nothing on disk
/// is created or changed.
pub fn run(config: &Settings, only: Option<&str>, dry_run: bool) -> Result<()> {
    let sections: Vec<&IndexSection> = match only {
        Some(name) => match config.index(name) {
            Some(section) => vec![section],
            None => bail!("No index named '{name}' in settings"),
        },
        None => config.indexes.iter().collect(),
    };

    if sections.is_empty() {
        bail!("No indexes configured. Run 'docsync init' and edit .docsync/settings.toml");
    }

    let mut failed_roots = 0;
    for section in sections {
        failed_roots += index_section(section, dry_run)?;
    }

    if failed_roots > 0 {
        bail!("Failed to walk {failed_roots} watched directories");
    }
    Ok(())
}

/// Walk every root of one section. Returns the number of roots that failed.
fn index_section(section: &IndexSection, dry_run: bool) -> Result<usize> {
    let target = if dry_run {
        Target::Memory(Arc::new(MemoryIndex::new()))
    } else {
        let store = TantivyStore::ensure(&section.path, &section.name, &section.analyzer)
            .with_context(|| format!("Cannot prepare index '{}'", section.name))?;
        Target::Store(store)
    };

    let pipeline = SyncPipeline::new(
        DocumentBuilder::new(Arc::new(PlainTextRenderer::new())),
        target.mutator(),
    );
    let walker = DirectoryWalker::new();
    let mut total = WalkStats::default();
    let mut failed_roots = 0;

    for spec in section.watch_specs() {
        match walker.walk(&spec, &pipeline) {
            Ok(stats) => {
                println!(
                    "{} -> {}: {} indexed, {} restricted, {} failed",
                    spec.root.display(),
                    spec.uri_prefix,
                    stats.indexed,
                    stats.restricted,
                    stats.failed
                );
                total.files_seen += stats.files_seen;
                total.indexed += stats.indexed;
                total.restricted += stats.restricted;
                total.failed += stats.failed;
            }
            Err(e) => {
                eprintln!("{}: {e}", spec.root.display());
                failed_roots += 1;
            }
        }
    }

    match &target {
        Target::Store(store) => println!(
            "Index '{}': {} files seen, {} documents stored",
            section.name,
            total.files_seen,
            store.num_docs()?
        ),
        Target::Memory(index) => println!(
            "Index '{}' (dry run): {} files seen, {} documents would be stored",
            section.name,
            total.files_seen,
            index.len()
        ),
    }
    Ok(failed_roots)
}

/// Where one section's pages go.
enum Target {
    Store(TantivyStore),
    Memory(Arc<MemoryIndex>),
}

impl Target {
    fn mutator(&self) -> Arc<dyn IndexMutator> {
        match self {
            Target::Store(store) => Arc::new(store.clone()),
            Target::Memory(index) => Arc::clone(index) as Arc<dyn IndexMutator>,
        }
    }
}
