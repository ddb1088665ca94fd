//! Watch command - index, then keep the indexes in sync until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};

use crate::config::Settings;
use crate::documents::{PlainTextRenderer, Renderer};
use crate::watcher::SyncSupervisor;

/// Run the watch command.
pub async fn run(config: &Settings, reap_interval: u64) -> Result<()> {
    if config.indexes.is_empty() {
        bail!("No indexes configured. Run 'docsync init' and edit .docsync/settings.toml");
    }

    let renderer: Arc<dyn Renderer> = Arc::new(PlainTextRenderer::new());
    let mut supervisor = SyncSupervisor::new();

    for section in &config.indexes {
        match supervisor.enable(section, Arc::clone(&renderer)).await {
            Ok(report) => {
                for (root, stats) in &report.started {
                    println!(
                        "watching {} ({} indexed, {} restricted, {} failed)",
                        root.display(),
                        stats.indexed,
                        stats.restricted,
                        stats.failed
                    );
                }
                for (root, e) in &report.failed {
                    eprintln!("not watching {}: {e}", root.display());
                }
            }
            Err(e) => eprintln!("index '{}' disabled: {e}", section.name),
        }
    }

    if supervisor.watched_roots().is_empty() {
        bail!("Nothing to watch");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(reap_interval.max(1)));
    ticker.tick().await;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::error!("[watch] cannot listen for Ctrl-C: {e}");
                }
                break;
            }
            _ = ticker.tick() => {
                for (root, e) in supervisor.reap().await {
                    eprintln!("stopped watching {}: {e}", root.display());
                }
                if supervisor.watched_roots().is_empty() {
                    supervisor.disable_all().await;
                    bail!("Every watcher has stopped");
                }
            }
        }
    }

    crate::log_event!("watch", "shutting down");
    supervisor.disable_all().await;
    Ok(())
}
