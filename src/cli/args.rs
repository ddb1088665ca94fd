//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Keep a full-text index in sync with Markdown files
#[derive(Parser)]
#[command(
    name = "docsync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Keep a full-text index in sync with Markdown files",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ docsync init              # Create .docsync/settings.toml\n  $ docsync index             # Walk every configured directory once\n  $ docsync watch             # Index, then follow changes until Ctrl-C\n  $ docsync get docs /docs/guide.md"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true, env = "DOCSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .docsync directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Parse one document's front matter
    #[command(about = "Show the front matter and rendered body of a document")]
    Parse {
        /// Markdown file to parse
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Walk every configured directory once
    #[command(about = "Index every configured directory without watching")]
    Index {
        /// Only index this index section
        #[arg(long, value_name = "NAME")]
        only: Option<String>,

        /// Dry run - show what would be indexed without touching the index
        #[arg(long)]
        dry_run: bool,
    },

    /// Index, then follow changes
    #[command(
        about = "Index every configured directory and watch for changes",
        after_help = "Runs until Ctrl-C. Changes are applied once a directory has been quiet for debounce_ms."
    )]
    Watch {
        /// Seconds between checks for failed watchers
        #[arg(long, default_value = "30", value_name = "SECONDS")]
        reap_interval: u64,
    },

    /// Look up one stored page
    #[command(about = "Print the record stored under a URI path")]
    Get {
        /// Index section name
        index: String,

        /// Logical URI path, e.g. /docs/guide.md
        uri_path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
