//! Layered configuration.
//!
//! Sources, lowest precedence first:
//! - Default values
//! - TOML configuration file (`.tabwatch/settings.toml`)
//! - Environment variables
//! - CLI argument overrides (applied by the caller)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `TW_` and use double underscores
//! to separate nested levels:
//! - `TW_WATCH__DEFAULT_INTERVAL_SECS=5` sets `watch.default_interval_secs`
//! - `TW_ARCHIVE__BACKEND=json` sets `archive.backend`
//! - `TW_CSV__HAS_HEADER=false` sets `csv.has_header`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding settings and archive data.
pub const CONFIG_DIR: &str = ".tabwatch";

/// Settings file name inside [`CONFIG_DIR`].
pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Logging levels
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Watch defaults and persistent watches
    #[serde(default)]
    pub watch: WatchConfig,

    /// CSV dialect
    #[serde(default)]
    pub csv: CsvConfig,

    /// Change archive
    #[serde(default)]
    pub archive: ArchiveConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all targets
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target level overrides
    #[serde(default)]
    pub modules: IndexMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Poll interval used when a watch does not set its own
    #[serde(default = "default_interval_secs")]
    pub default_interval_secs: u64,

    /// Owner name for watches registered from configuration
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Resources registered and started at startup
    #[serde(default)]
    pub resources: Vec<WatchedResource>,
}

/// A watch declared in the settings file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchedResource {
    pub path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CsvConfig {
    /// Field delimiter, must be a single ASCII character
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Whether the first row names the columns
    #[serde(default = "default_true")]
    pub has_header: bool,

    /// Trim whitespace around fields
    #[serde(default = "default_false")]
    pub trim: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveBackend {
    Memory,
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ArchiveConfig {
    /// Storage backend for version records
    #[serde(default = "default_backend")]
    pub backend: ArchiveBackend,

    /// Directory for the json backend
    #[serde(default = "default_archive_path")]
    pub path: PathBuf,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_interval_secs() -> u64 {
    10
}
fn default_owner() -> String {
    "tabwatch".to_string()
}
fn default_delimiter() -> char {
    ','
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_backend() -> ArchiveBackend {
    ArchiveBackend::Json
}
fn default_archive_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("archive")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            logging: LoggingConfig::default(),
            watch: WatchConfig::default(),
            csv: CsvConfig::default(),
            archive: ArchiveConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: IndexMap::new(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            default_interval_secs: default_interval_secs(),
            owner: default_owner(),
            resources: Vec::new(),
        }
    }
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: true,
            trim: false,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_archive_path(),
        }
    }
}

impl WatchConfig {
    pub fn default_interval(&self) -> Duration {
        Duration::from_secs(self.default_interval_secs)
    }

    /// Interval for a configured resource, falling back to the default.
    pub fn interval_for(&self, resource: &WatchedResource) -> Duration {
        Duration::from_secs(resource.interval_secs.unwrap_or(self.default_interval_secs))
    }
}

impl CsvConfig {
    /// The delimiter as a byte, if it is a single ASCII character.
    pub fn delimiter_byte(&self) -> Option<u8> {
        if self.delimiter.is_ascii() {
            Some(self.delimiter as u8)
        } else {
            None
        }
    }
}

impl Settings {
    /// Base figment with defaults and environment overrides around `file`.
    fn figment(config_path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path.as_ref()))
            // Double underscore separates nested levels, single underscore
            // stays part of the field name.
            .merge(Env::prefixed("TW_").map(|key| key.as_str().to_lowercase().replace("__", ".").into()))
    }

    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));

        Self::figment(config_path).extract().map_err(Box::new)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path).extract().map_err(Box::new)
    }

    /// Find the settings file by looking for `.tabwatch` from the current
    /// directory up to the root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(SETTINGS_FILE));
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Write these settings as the settings file of the project at `root`.
    pub fn init_config_file(
        &self,
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join(SETTINGS_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        self.save(&config_path)?;
        Ok(config_path)
    }
}
