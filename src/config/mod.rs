//! # Config Module
//!
//! Application configuration, loaded once at process start and passed
//! explicitly to whatever needs it.
//!
//! ## Sources (later wins)
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, or `imgsim.toml` in the working directory)
//! 3. Environment variables prefixed `IMGSIM_` (e.g. `IMGSIM_DEFAULT_TOP_K=10`)

use crate::core::hasher::SUPPORTED_HASH_SIZES;
use crate::error::SimilarityError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "imgsim.toml";

const APP_DIR: &str = "image-similarity-checker";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database holding reference records
    pub database_path: PathBuf,
    /// Directory holding reference image blobs
    pub blob_root: PathBuf,
    /// Key prefix for reference blobs
    pub key_prefix: String,
    /// Side of the DCT hash block (8 → 64-bit fingerprints)
    pub hash_size: u32,
    /// Minimum similarity shown when none is requested
    pub default_threshold: f64,
    /// Number of matches shown when none is requested
    pub default_top_k: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            database_path: data_dir.join("references.db"),
            blob_root: data_dir.join("blobs"),
            key_prefix: "source-images".to_string(),
            hash_size: 8,
            default_threshold: 40.0,
            default_top_k: 5,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self, SimilarityError> {
        let mut builder = Config::builder();

        builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let config: AppConfig = builder
            .add_source(Environment::with_prefix("IMGSIM").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SimilarityError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), SimilarityError> {
        if !SUPPORTED_HASH_SIZES.contains(&self.hash_size) {
            return Err(SimilarityError::Config(format!(
                "hash_size must be one of {:?}, got {}",
                SUPPORTED_HASH_SIZES, self.hash_size
            )));
        }
        if !(0.0..=100.0).contains(&self.default_threshold) {
            return Err(SimilarityError::Config(format!(
                "default_threshold must be between 0 and 100, got {}",
                self.default_threshold
            )));
        }
        if self.default_top_k == 0 {
            return Err(SimilarityError::Config(
                "default_top_k must be at least 1".to_string(),
            ));
        }
        if self.key_prefix.trim_matches('/').is_empty() {
            return Err(SimilarityError::Config("key_prefix must not be empty".to_string()));
        }
        Ok(())
    }
}
