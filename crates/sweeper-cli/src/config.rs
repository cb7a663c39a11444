//! Configuration Settings
//!
//! Settings are loaded from a TOML file passed with `--config`:
//!
//! ```toml
//! [cleaning]
//! remove_duplicates = true
//! fill_missing = true
//! columns = ["name", "score"]
//!
//! [export]
//! output_dir = "cleaned/"
//! delimiter = ";"
//! ```
//!
//! Command-line flags take precedence over the file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sweeper_data::PipelineOptions;

/// Top-level settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Cleaning steps
    pub cleaning: CleaningSettings,
    /// Export settings
    pub export: ExportSettings,
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load settings from a config file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                Settings::from_toml_str(&content)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))
            }
            None => Ok(Settings::default()),
        }
    }

    /// Pipeline options described by these settings
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            remove_duplicates: self.cleaning.remove_duplicates,
            fill_missing: self.cleaning.fill_missing,
            columns: if self.cleaning.columns.is_empty() {
                None
            } else {
                Some(self.cleaning.columns.clone())
            },
        }
    }
}

/// Cleaning configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CleaningSettings {
    /// Drop repeated rows
    pub remove_duplicates: bool,
    /// Fill gaps in numeric columns with the column mean
    pub fill_missing: bool,
    /// Columns to keep (all when empty)
    pub columns: Vec<String>,
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportSettings {
    /// Directory receiving exported files
    pub output_dir: String,
    /// Field delimiter for CSV output
    pub delimiter: char,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: "output".to_string(),
            delimiter: ',',
        }
    }
}

impl ExportSettings {
    /// Delimiter as a single byte
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .with_context(|| format!("Delimiter must be an ASCII character: {:?}", self.delimiter))
    }
}
