//! Engine Module
//!
//! Owns one data directory and wires the layers together.
//!
//! ## Responsibilities
//! - Create the data directory and the shared object cache
//! - Open the default small-file container
//! - Open further block stores that share the same cache
//! - Flush everything on close

use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::blockstore::BlockStore;
use crate::cache::ObjectCache;
use crate::config::Config;
use crate::error::{BlobError, Result};
use crate::multiplexer::FileMultiplexer;

/// Entry point over one data directory
///
/// ## Ownership
/// - The cache is constructed here and handed to every store (`Arc`)
/// - The container is declared before the cache so that, on drop, it
///   flushes into the cache before the cache flushes to disk
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Default small-file container
    files: FileMultiplexer,

    /// Write-back cache shared by all stores of this engine
    cache: Arc<ObjectCache>,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Create the data directory if needed
    /// 3. Build the shared cache
    /// 4. Open the default container (rebuilds its file table)
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let cache = Arc::new(ObjectCache::new(config.cache_capacity));
        let files = FileMultiplexer::open(Arc::clone(&cache), config.container_path(), config.block_size)?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            block_size = config.block_size,
            cache_capacity = config.cache_capacity,
            "engine opened"
        );

        Ok(Self { config, files, cache })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// The default small-file container
    pub fn files(&self) -> &FileMultiplexer {
        &self.files
    }

    /// Open a named block store in the data directory, sharing this
    /// engine's cache. `name` must be a bare file name with an extension.
    pub fn open_block_store(&self, name: &str) -> Result<BlockStore> {
        if Path::new(name).file_name() != Some(OsStr::new(name)) {
            return Err(BlobError::InvalidName(format!(
                "'{}' is not a bare file name",
                name
            )));
        }
        if name == self.config.container_name {
            return Err(BlobError::InvalidName(format!(
                "'{}' is the engine's file container",
                name
            )));
        }
        BlockStore::open(
            Arc::clone(&self.cache),
            self.config.data_dir.join(name),
            self.config.block_size,
        )
    }

    /// Persist the container and write all cached objects to disk
    pub fn flush(&self) -> Result<()> {
        self.files.flush(false)?;
        self.cache.flush()?;
        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Unlike dropping, reports flush failures.
    pub fn close(self) -> Result<()> {
        self.flush()?;
        tracing::info!(data_dir = %self.config.data_dir.display(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Shared object cache
    pub fn cache(&self) -> &Arc<ObjectCache> {
        &self.cache
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
