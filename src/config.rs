//! Configuration module for the occupation search engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `NCOFIND_` and use double
//! underscores to separate nested levels:
//! - `NCOFIND_INDEXING__BATCH_SIZE=100` sets `indexing.batch_size`
//! - `NCOFIND_SEARCH__NUM_CANDIDATES=100` sets `search.num_candidates`
//! - `NCOFIND_DEBUG=true` sets `debug`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Process-wide debug flag, set once from Settings at startup.
static GLOBAL_DEBUG: OnceLock<bool> = OnceLock::new();

/// Enable or disable the global debug flag (first call wins).
pub fn set_global_debug(enabled: bool) {
    let _ = GLOBAL_DEBUG.set(enabled);
}

/// Check whether global debug output is enabled.
pub fn is_global_debug_enabled() -> bool {
    *GLOBAL_DEBUG.get().unwrap_or(&false)
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Path to the index directory
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Dataset file locations
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Indexing configuration
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatasetConfig {
    /// Authoritative occupation CSV (NCO2015_Code, Title, NCO2004_Code)
    #[serde(default = "default_occupations_path")]
    pub occupations: PathBuf,

    /// Two-column (code,name) lookup table for divisions
    #[serde(default = "default_division_path")]
    pub division: PathBuf,

    /// Two-column (code,name) lookup table for subdivisions
    #[serde(default = "default_subdivision_path")]
    pub subdivision: PathBuf,

    /// Two-column (code,name) lookup table for groups
    #[serde(default = "default_group_path")]
    pub group: PathBuf,

    /// Two-column (code,name) lookup table for families
    #[serde(default = "default_family_path")]
    pub family: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Name of the index to build and query
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Number of documents encoded and inserted per round-trip
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// Embedding model for titles and queries (multilingual)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Default number of results per query
    #[serde(default = "default_k")]
    pub k: usize,

    /// Candidate pool size for approximate nearest-neighbor search
    #[serde(default = "default_num_candidates")]
    pub num_candidates: usize,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from(".ncofind/index")
}
fn default_false() -> bool {
    false
}
fn default_occupations_path() -> PathBuf {
    PathBuf::from("dataset/nco2015_full.csv")
}
fn default_division_path() -> PathBuf {
    PathBuf::from("dataset/division.csv")
}
fn default_subdivision_path() -> PathBuf {
    PathBuf::from("dataset/subdivision.csv")
}
fn default_group_path() -> PathBuf {
    PathBuf::from("dataset/group.csv")
}
fn default_family_path() -> PathBuf {
    PathBuf::from("dataset/family.csv")
}
fn default_index_name() -> String {
    "nco2015".to_string()
}
fn default_batch_size() -> usize {
    200
}
fn default_embedding_model() -> String {
    "ParaphraseMLMpnetBaseV2".to_string()
}
fn default_k() -> usize {
    5
}
fn default_num_candidates() -> usize {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            debug: false,
            dataset: DatasetConfig::default(),
            indexing: IndexingConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            occupations: default_occupations_path(),
            division: default_division_path(),
            subdivision: default_subdivision_path(),
            group: default_group_path(),
            family: default_family_path(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            index_name: default_index_name(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            k: default_k(),
            num_candidates: default_num_candidates(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path =
            Self::find_workspace_config().unwrap_or_else(|| PathBuf::from(".ncofind/settings.toml"));

        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Layer in environment variables with NCOFIND_ prefix
            // Use double underscore (__) to separate nested levels
            // Single underscore (_) remains as is within field names
            .merge(Env::prefixed("NCOFIND_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("NCOFIND_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Check that the loaded configuration is usable.
    ///
    /// Catches values that would only fail deep inside the pipeline,
    /// such as a zero batch size or an empty index name.
    pub fn check(&self) -> Result<(), String> {
        if self.indexing.index_name.is_empty() {
            return Err("indexing.index_name must not be empty".to_string());
        }
        if self.indexing.batch_size == 0 {
            return Err("indexing.batch_size must be at least 1".to_string());
        }
        if self.search.model.is_empty() {
            return Err("search.model must not be empty".to_string());
        }
        if self.search.k == 0 {
            return Err("search.k must be at least 1".to_string());
        }
        if self.search.num_candidates == 0 {
            return Err("search.num_candidates must be at least 1".to_string());
        }
        Ok(())
    }

    /// Find the workspace root by looking for a .ncofind directory,
    /// searching from the current directory up to root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".ncofind");
            if config_dir.exists() && config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(
        &self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(".ncofind/settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = r#"# ncofind Configuration File

# Version of the configuration schema
version = 1

# Path to the index directory (relative to workspace root)
index_path = ".ncofind/index"

# Global debug mode
debug = false

[dataset]
# Authoritative occupation CSV with NCO2015_Code, Title, NCO2004_Code columns
occupations = "dataset/nco2015_full.csv"

# Two-column (code,name) hierarchy lookup tables
division = "dataset/division.csv"
subdivision = "dataset/subdivision.csv"
group = "dataset/group.csv"
family = "dataset/family.csv"

[indexing]
# Name of the index to build and query
index_name = "nco2015"

# Documents encoded and inserted per round-trip
batch_size = 200

[search]
# Embedding model for titles and queries (must be multilingual for
# spoken-language queries). Supported: ParaphraseMLMpnetBaseV2,
# ParaphraseMLMiniLML12V2, ParaphraseMLMiniLML12V2Q (quantized),
# MultilingualE5Small, AllMiniLML6V2
model = "ParaphraseMLMpnetBaseV2"

# Default number of results per query
k = 5

# Candidate pool size for approximate nearest-neighbor search.
# Larger values improve recall at the cost of latency.
num_candidates = 50
"#;

        std::fs::write(&config_path, template)?;

        if force {
            println!("Overwrote configuration at: {}", config_path.display());
        } else {
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
        }

        Ok(config_path)
    }
}
