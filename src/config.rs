//! Configuration for AtlasBlob
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BlobError, Result};

/// One mebibyte, the default segment size
pub const MB: usize = 1024 * 1024;

/// Main configuration for an AtlasBlob instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all objects
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── SmallFiles.0000000.bin         (segments)
    ///     ├── SmallFiles.0000001.bin
    ///     └── SmallFiles.bin.index.csv       (segment index)
    pub data_dir: PathBuf,

    /// Maximum size of one persisted segment (in bytes)
    pub block_size: usize,

    /// File name of the default small-file container inside `data_dir`.
    /// Must carry an extension; segments reuse it.
    pub container_name: String,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Max number of objects held by the write-back cache (0 disables caching)
    pub cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./atlasblob_data"),
            block_size: MB,
            container_name: "SmallFiles.bin".to_string(),
            cache_capacity: 32,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the settings describe a usable layout
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(BlobError::Config("block_size must be positive".to_string()));
        }
        let has_extension = Path::new(&self.container_name)
            .extension()
            .map(|ext| !ext.is_empty())
            .unwrap_or(false);
        if !has_extension {
            return Err(BlobError::Config(format!(
                "container name '{}' must have an extension",
                self.container_name
            )));
        }
        Ok(())
    }

    /// Full path of the default container
    pub fn container_path(&self) -> PathBuf {
        self.data_dir.join(&self.container_name)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the segment size (in bytes)
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Set the default container file name
    pub fn container_name(mut self, name: impl Into<String>) -> Self {
        self.config.container_name = name.into();
        self
    }

    /// Set the cache capacity (number of objects, 0 disables caching)
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
