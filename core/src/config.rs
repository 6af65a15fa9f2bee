//! Configuration management (config.toml)
//!
//! Step bounds and display settings. Every value has a default, so an empty or
//! missing file yields [`InspectorConfig::default`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Elements shown per container, regardless of the reported count
pub const MAX_DISPLAY_ELEMENTS: usize = 256;
/// Occupied hash slots collected before the scan stops
pub const MAX_HASH_STEPS: usize = 255;
/// Link hops allowed for one tree descent or ascent
pub const MAX_TREE_STEPS: usize = 1000;
/// Chunk budget of a deque, in bytes
pub const DEQUE_PAGE_SIZE: u64 = 4096;
/// Lower bound on deque chunk length, in elements
pub const DEQUE_MIN_CHUNK_ELEMENTS: u64 = 32;
/// Bytes of string content shown in a summary
pub const MAX_SUMMARY_BYTES: usize = 1024;
/// String counts above this are treated as uninitialized memory
pub const MAX_STRING_COUNT: u64 = 0x1000_0000;
/// Ordered map counts above this are treated as corrupt
pub const MAX_MAP_COUNT: u64 = 0xff00_0000;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InspectorConfig {
    /// Step bounds and sanity thresholds
    #[serde(default)]
    pub limits: Limits,
    /// Output settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Step bounds and sanity thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_max_display_elements")]
    pub max_display_elements: usize,
    #[serde(default = "default_max_hash_steps")]
    pub max_hash_steps: usize,
    #[serde(default = "default_max_tree_steps")]
    pub max_tree_steps: usize,
    #[serde(default = "default_deque_page_size")]
    pub deque_page_size: u64,
    #[serde(default = "default_deque_min_chunk_elements")]
    pub deque_min_chunk_elements: u64,
    #[serde(default = "default_max_summary_bytes")]
    pub max_summary_bytes: usize,
    #[serde(default = "default_max_string_count")]
    pub max_string_count: u64,
    #[serde(default = "default_max_map_count")]
    pub max_map_count: u64,
}

/// Output settings for rendered trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Levels of children expanded below the root (default: 2)
    #[serde(default = "default_tree_depth")]
    pub tree_depth: usize,
}

fn default_max_display_elements() -> usize {
    MAX_DISPLAY_ELEMENTS
}
fn default_max_hash_steps() -> usize {
    MAX_HASH_STEPS
}
fn default_max_tree_steps() -> usize {
    MAX_TREE_STEPS
}
fn default_deque_page_size() -> u64 {
    DEQUE_PAGE_SIZE
}
fn default_deque_min_chunk_elements() -> u64 {
    DEQUE_MIN_CHUNK_ELEMENTS
}
fn default_max_summary_bytes() -> usize {
    MAX_SUMMARY_BYTES
}
fn default_max_string_count() -> u64 {
    MAX_STRING_COUNT
}
fn default_max_map_count() -> u64 {
    MAX_MAP_COUNT
}
fn default_tree_depth() -> usize {
    2
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_display_elements: default_max_display_elements(),
            max_hash_steps: default_max_hash_steps(),
            max_tree_steps: default_max_tree_steps(),
            deque_page_size: default_deque_page_size(),
            deque_min_chunk_elements: default_deque_min_chunk_elements(),
            max_summary_bytes: default_max_summary_bytes(),
            max_string_count: default_max_string_count(),
            max_map_count: default_max_map_count(),
        }
    }
}

impl Limits {
    /// Displayed length for a reported element count
    pub fn display_len(&self, count: u64) -> usize {
        count.min(self.max_display_elements as u64) as usize
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            tree_depth: default_tree_depth(),
        }
    }
}

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\memlens\config`
/// On macOS: `~/Library/Application Support/io.memlens.memlens`
/// On Linux: `~/.config/memlens`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.memlens", "", "memlens")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from the platform config directory.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> InspectorConfig {
    let Some(path) = config_dir().map(|dir| dir.join("config.toml")) else {
        return InspectorConfig::default();
    };
    if !path.exists() {
        return InspectorConfig::default();
    }
    match load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("{}; using defaults", e);
            InspectorConfig::default()
        }
    }
}

/// Loads the configuration from an explicit file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_from(path: &Path) -> Result<InspectorConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
