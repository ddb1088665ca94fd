//! Configuration for docsync.
//!
//! Settings are layered:
//! - Default values
//! - TOML configuration file (`.docsync/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCSYNC_` and use double
//! underscores to separate nested levels:
//! - `DOCSYNC_DEBUG=true` sets `debug`
//! - `DOCSYNC_LOGGING__DEFAULT=info` sets `logging.default`

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::documents::SlugSet;
use crate::types::WatchSpec;
use crate::watcher::DEFAULT_DEBOUNCE_MS;

const CONFIG_DIR: &str = ".docsync";
const CONFIG_FILE: &str = "settings.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file already exists at {0}. Use --force to overwrite")]
    AlreadyExists(PathBuf),

    #[error("Cannot write configuration to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Indexes kept in sync, each with its own watched directories
    #[serde(default)]
    pub indexes: Vec<IndexSection>,
}

/// Log levels: a default plus per-target overrides.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,

    #[serde(default)]
    pub modules: HashMap<String, String>,
}

/// One full-text index and the directories feeding it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IndexSection {
    pub name: String,

    /// Index directory
    pub path: PathBuf,

    /// Tokenizer for text fields: default, raw, en_stem or whitespace
    #[serde(default = "default_analyzer")]
    pub analyzer: String,

    /// File-name suffix of indexed files
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Documents tagged with any of these topics are never indexed
    #[serde(default)]
    pub restricted: Vec<String>,

    /// Quiet period before changes are applied
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Watched directory -> URI prefix
    #[serde(default)]
    pub watch_dirs: BTreeMap<PathBuf, String>,
}

fn default_version() -> u32 {
    1
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_analyzer() -> String {
    "default".to_string()
}
fn default_extension() -> String {
    ".md".to_string()
}
fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            debug: false,
            logging: LoggingConfig::default(),
            indexes: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl IndexSection {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            analyzer: default_analyzer(),
            watch_dirs: BTreeMap::new(),
            extension: default_extension(),
            restricted: Vec::new(),
            debounce_ms: default_debounce_ms(),
        }
    }

    /// The section written by `init`: `docs/` served under `/docs/`.
    pub fn example() -> Self {
        let mut section = Self::new("docs", PathBuf::from(CONFIG_DIR).join("index/docs"));
        section
            .watch_dirs
            .insert(PathBuf::from("docs"), "/docs/".to_string());
        section.restricted.push("private".to_string());
        section
    }

    /// One `WatchSpec` per watched directory.
    ///
    /// Relative directories are resolved against the current directory.
    pub fn watch_specs(&self) -> Vec<WatchSpec> {
        let restricted: SlugSet = self.restricted.iter().collect();

        self.watch_dirs
            .iter()
            .map(|(dir, prefix)| {
                let root = std::path::absolute(dir).unwrap_or_else(|_| dir.clone());
                WatchSpec::new(root, prefix.as_str(), self.extension.as_str(), restricted.clone())
            })
            .collect()
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::load_from(config_path)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels
            .merge(Env::prefixed("DOCSYNC_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.docsync/settings.toml` from the current directory upwards
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Look up an index section by name
    pub fn index(&self, name: &str) -> Option<&IndexSection> {
        self.indexes.iter().find(|section| section.name == name)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string).map_err(io_error)?;

        Ok(())
    }

    /// Create a default settings file under `dir`
    pub fn init_config_file(dir: impl AsRef<Path>, force: bool) -> Result<PathBuf, ConfigError> {
        let config_path = dir.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err(ConfigError::AlreadyExists(config_path));
        }

        let settings = Settings {
            indexes: vec![IndexSection::example()],
            ..Settings::default()
        };
        settings.save(&config_path)?;

        Ok(config_path)
    }
}
