//! Configuration for CairnDB
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::storage::DEFAULT_CACHE_CAPACITY;

/// Main configuration for a CairnDB instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding one file per database.
    /// Internal structure:
    ///   {storage_dir}/
    ///     ├── shop.cdb
    ///     └── inventory.cdb
    pub storage_dir: PathBuf,

    /// Extension (without the dot) of database files
    pub file_extension: String,

    /// How block writes are pushed to stable storage
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Number of decoded blocks kept in the LRU block cache
    pub cache_capacity: usize,
}

/// Block write sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Leave flushing to the OS page cache
    OsBuffered,

    /// fdatasync after every block write (safest, slowest)
    EveryWrite,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./cairn_data"),
            file_extension: "cdb".to_string(),
            sync_strategy: SyncStrategy::OsBuffered,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the storage directory (root for all database files)
    pub fn storage_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = path.into();
        self
    }

    /// Set the database file extension
    pub fn file_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.file_extension = ext.into();
        self
    }

    /// Set the sync strategy for block writes
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the block cache capacity (in blocks)
    pub fn cache_capacity(mut self, blocks: usize) -> Self {
        self.config.cache_capacity = blocks;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
