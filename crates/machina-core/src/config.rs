//! Runtime tuning and data-file loading.
//!
//! Provides format detection (RON/JSON/TOML) by file extension and the
//! [`MachinaConfig`] tree. Every field has a default, so a config file only
//! needs to name the values it changes.

use crate::sim::Ticks;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading configuration or material tables.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// Two materials share one type id.
    #[error("duplicate material id {id}")]
    DuplicateMaterial { id: u16 },

    /// A material refers to an id the table does not define.
    #[error("unknown material id {id} ({context})")]
    UnknownMaterial { id: u16, context: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Deserialize already-read text. `origin` is only used in error messages.
pub fn parse_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    origin: &Path,
) -> Result<T, ConfigError> {
    let parse_err = |detail: String| ConfigError::Parse {
        file: origin.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    parse_str(&content, format, path)
}

// ===========================================================================
// Configuration tree
// ===========================================================================

/// Top-level tuning for all machine kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachinaConfig {
    /// Ticks spent turning an active machine to a new heading.
    pub rotate_delay: Ticks,
    pub drill: DrillConfig,
    pub builder: BuilderConfig,
}

impl Default for MachinaConfig {
    fn default() -> Self {
        Self {
            rotate_delay: 20,
            drill: DrillConfig::default(),
            builder: BuilderConfig::default(),
        }
    }
}

impl MachinaConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_file(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrillConfig {
    /// Ticks to advance one block.
    pub move_delay: Ticks,
    /// Simultaneously active drills per owner. `None` is unlimited.
    pub max_active: Option<u32>,
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            move_delay: 20,
            max_active: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Ticks added per block placed.
    pub build_delay: Ticks,
    /// Ticks to advance one block.
    pub move_delay: Ticks,
    /// Simultaneously active builders per owner. `None` is unlimited.
    pub max_active: Option<u32>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            build_delay: 10,
            move_delay: 20,
            max_active: Some(1),
        }
    }
}
