//! Configuration file handling with TOML support.

use crate::models::Metric;
use crate::storage::DEFAULT_STORAGE_KEY;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// OCR engine and extraction settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Display settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Directory holding the snapshot; defaults to the platform data dir
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Key the snapshot is stored under
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Log level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            storage_key: default_storage_key(),
            log_level: default_log_level(),
        }
    }
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}
fn default_log_level() -> String {
    "warn".to_string()
}

/// OCR settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrConfig {
    /// Engine executable
    #[serde(default = "default_ocr_command")]
    pub command: String,

    /// Language hint passed to the engine
    #[serde(default = "default_ocr_language")]
    pub language: String,

    /// Price label patterns, tried in order; empty means built-in
    #[serde(default)]
    pub price_patterns: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: default_ocr_command(),
            language: default_ocr_language(),
            price_patterns: Vec::new(),
        }
    }
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}
fn default_ocr_language() -> String {
    "eng+jpn".to_string()
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DisplayConfig {
    /// Metric charted when the view opens
    #[serde(default)]
    pub default_metric: Metric,
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from default location or create default.
    pub fn load_or_default() -> Self {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to load config: {:#}", e);
                    }
                }
            }
        }
        Config::default()
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stonklog").join("config.toml"))
    }
}

/// Generate a sample configuration file content.
pub fn sample_config() -> &'static str {
    r##"# stonklog configuration file

[general]
# Where the snapshot lives (defaults to the platform data directory)
# data_dir = "/home/me/.local/share/stonklog"
# Storage key; older data used "stock-tracker-v1"
storage_key = "stock-tracker-v2"
# Log level when RUST_LOG is unset: error, warn, info, debug, trace
log_level = "warn"

[ocr]
# OCR engine executable (tesseract command line)
command = "tesseract"
# Language hint
language = "eng+jpn"
# Price label patterns, first capture group is the number. Tried in order.
# price_patterns = ['(?i)(?:株価|Price)\s*:?\s*([0-9][0-9.,]*)']

[display]
# Metric charted on open: price, eps, per, pbr
default_metric = "per"
"##
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(sample_config()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ocr]
            language = "jpn"
            [display]
            default_metric = "price"
            "#,
        )
        .unwrap();
        assert_eq!(config.ocr.language, "jpn");
        assert_eq!(config.ocr.command, "tesseract");
        assert_eq!(config.general.storage_key, "stock-tracker-v2");
        assert_eq!(config.display.default_metric, Metric::Price);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[general]\ndata_dir = \"/data\"\n[ocr]\nprice_patterns = ['Close\\s*([0-9.]+)']\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.general.data_dir, Some(PathBuf::from("/data")));
        assert_eq!(config.ocr.price_patterns, vec![r"Close\s*([0-9.]+)".to_string()]);
    }

    #[test]
    fn test_load_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[general\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
