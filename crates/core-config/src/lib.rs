//! Configuration: `seam.toml` discovery and parsing.
//!
//! A `seam.toml` in the working directory wins, then the platform config
//! directory (`<config>/seam/seam.toml`). Unknown fields are tolerated and
//! a file that fails to parse falls back to defaults with a warning, so a
//! broken config never blocks startup.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Lines per mouse wheel notch.
    pub step: usize,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        ScrollConfig { step: 3 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Window for recognizing a double click, in milliseconds.
    pub double_click_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            double_click_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Suffix of the staging file a save writes before the rename.
    pub backup_suffix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            backup_suffix: "~".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub scroll: ScrollConfig,
    pub input: InputConfig,
    pub editor: EditorConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ConfigFile,
    /// Where the config was read from, if anywhere.
    pub path: Option<PathBuf>,
}

/// Best-effort config path: working directory first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("seam.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("seam").join("seam.toml");
    }
    local
}

/// Load configuration from `path`, or from the discovered location.
pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config loaded");
            Ok(Config {
                file,
                path: Some(path),
            })
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), %e, "config parse failed, using defaults");
            Ok(Config::default())
        }
    }
}
