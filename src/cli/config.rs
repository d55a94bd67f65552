//! TOML configuration file support for the ingest stage.
//!
//! Instead of passing many CLI flags, users can specify settings in a
//! config file:
//!
//! ```toml
//! # psmprep.toml
//! [ingest]
//! psm_dir = "raw_data/fragpipe"
//! output_dir = "processed_data"
//! workers = 16
//! exclude = "lib"
//! ```
//!
//! CLI flags always override config file values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure for psmprep.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Ingest-specific settings.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Configuration for the ingest command.
#[derive(Debug, Default, Deserialize)]
pub struct IngestConfig {
    /// Directory tree containing psm.tsv files.
    pub psm_dir: Option<PathBuf>,

    /// Output directory for the consolidated tables.
    pub output_dir: Option<PathBuf>,

    /// Number of worker threads.
    pub workers: Option<usize>,

    /// Folder name to exclude (library/reference runs).
    pub exclude: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}
