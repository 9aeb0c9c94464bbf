//! Storage
//!
//! Owns the database file handle and performs all block I/O.
//!
//! ## Responsibilities
//! - Create a new file (TOC written at block 0) or open an existing one
//! - Read blocks through the LRU cache, write blocks through to disk
//! - Release blocks by overwriting them with a `Free` block
//! - Find free blocks by linear scan; no separate free list exists
//!
//! Every I/O failure is a single attempt, reported as a distinct fatal
//! error (`Open`, `Seek`, `Read`, `Write`). There is no retry and no
//! partial-write recovery.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::config::{Config, SyncStrategy};
use crate::error::{CairnError, Result};
use crate::model::Toc;

use super::{
    Block, BlockCache, BlockNumber, BlockType, CacheStats, MonoStorable, Visit, BLOCK_SIZE,
    TOC_BLOCK,
};

/// Block-addressed access to one database file
pub struct Storage {
    /// Path of the open file
    path: PathBuf,

    /// Open handle (closed when Storage is dropped)
    file: File,

    /// Write-through cache of recently used blocks
    cache: BlockCache,

    sync_strategy: SyncStrategy,
}

impl Storage {
    /// Create (or truncate) a database file and persist `toc` at block 0
    pub fn create(path: &Path, toc: &Toc, config: &Config) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|source| CairnError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut storage = Self::with_file(path, file, config);
        storage.save_mono_storable(toc)?;

        info!(path = %path.display(), "created database file");
        Ok(storage)
    }

    /// Open an existing database file and load its TOC from block 0.
    ///
    /// Fails if block 0 is missing or is not a TOC block.
    pub fn open(path: &Path, config: &Config) -> Result<(Self, Toc)> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| CairnError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut storage = Self::with_file(path, file, config);
        let toc: Toc = storage.decode_mono_storable(TOC_BLOCK)?;

        info!(
            path = %path.display(),
            tables = toc.len(),
            "opened database file"
        );
        Ok((storage, toc))
    }

    fn with_file(path: &Path, file: File, config: &Config) -> Self {
        Self {
            path: path.to_path_buf(),
            file,
            cache: BlockCache::new(config.cache_capacity),
            sync_strategy: config.sync_strategy,
        }
    }

    // =========================================================================
    // Block I/O
    // =========================================================================

    /// Read block `n`, from the cache when possible
    pub fn read_block(&mut self, n: BlockNumber) -> Result<Block> {
        if let Some(block) = self.cache.lookup(n) {
            trace!(block = n, "block cache hit");
            return Ok(block);
        }

        let offset = Self::offset_of(n)?;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|source| CairnError::Seek { block: n, source })?;

        let mut bytes = [0u8; BLOCK_SIZE];
        self.file
            .read_exact(&mut bytes)
            .map_err(|source| CairnError::Read { block: n, source })?;

        trace!(block = n, "read block from disk");
        let block = Block::from_bytes(bytes);
        self.cache.put(n, block);
        Ok(block)
    }

    /// Write block `n` to disk, then refresh the cache
    pub fn write_block(&mut self, block: &Block, n: BlockNumber) -> Result<()> {
        let offset = Self::offset_of(n)?;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|source| CairnError::Seek { block: n, source })?;

        self.file
            .write_all(block.as_bytes())
            .map_err(|source| CairnError::Write { block: n, source })?;

        if self.sync_strategy == SyncStrategy::EveryWrite {
            self.file
                .sync_data()
                .map_err(|source| CairnError::Write { block: n, source })?;
        }

        trace!(block = n, "wrote block");
        self.cache.put(n, *block);
        Ok(())
    }

    /// Mark block `n` as free by overwriting it with an empty `Free` block
    pub fn release_block(&mut self, n: BlockNumber) -> Result<()> {
        if n == TOC_BLOCK {
            return Err(CairnError::Invariant(
                "the TOC block can never be released".to_string(),
            ));
        }
        debug!(block = n, "releasing block");
        self.write_block(&Block::new(BlockType::Free), n)
    }

    /// First `Free` block in the file, or one past the end if there is none.
    ///
    /// Linear in the file size. Two calls without an intervening write
    /// return the same number, so callers must write the block before
    /// allocating again.
    pub fn find_free_block_number(&mut self) -> Result<BlockNumber> {
        let mut found = None;
        self.each_block(|n, block| {
            if block.is_free() {
                found = Some(n);
                return Ok(Visit::Stop);
            }
            Ok(Visit::Continue)
        })?;

        let n = match found {
            Some(n) => n,
            None => self.block_count()?,
        };
        debug!(block = n, "allocated block");
        Ok(n)
    }

    /// Number of whole blocks currently in the file
    pub fn block_count(&self) -> Result<BlockNumber> {
        let len = self.file.metadata()?.len();
        BlockNumber::try_from(len / BLOCK_SIZE as u64)
            .map_err(|_| CairnError::Corrupt(format!("file too large: {} bytes", len)))
    }

    /// Tag of block `n`
    pub fn block_type(&mut self, n: BlockNumber) -> Result<BlockType> {
        self.read_block(n)?.block_type()
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Visit every block from 0 upward until the visitor stops or fails
    pub fn each_block<F>(&mut self, mut visitor: F) -> Result<()>
    where
        F: FnMut(BlockNumber, &Block) -> Result<Visit>,
    {
        let count = self.block_count()?;
        for n in 0..count {
            let block = self.read_block(n)?;
            if visitor(n, &block)? == Visit::Stop {
                break;
            }
        }
        Ok(())
    }

    /// Visit the given blocks in order until the visitor stops or fails
    pub fn visit_blocks<F>(&mut self, blocks: &[BlockNumber], mut visitor: F) -> Result<()>
    where
        F: FnMut(BlockNumber, &Block) -> Result<Visit>,
    {
        for &n in blocks {
            let block = self.read_block(n)?;
            if visitor(n, &block)? == Visit::Stop {
                break;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Encode a record and write it to its own block
    pub fn save_mono_storable<T: MonoStorable>(&mut self, item: &T) -> Result<()> {
        let block = Block::encode(item)?;
        self.write_block(&block, item.block_number())
    }

    /// Read and decode the record stored in block `n`
    pub fn decode_mono_storable<T: MonoStorable>(&mut self, n: BlockNumber) -> Result<T> {
        let mut item: T = self.read_block(n)?.decode()?;
        item.set_block_number(n);
        Ok(item)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Flush OS buffers for the file
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn offset_of(n: BlockNumber) -> Result<u64> {
        u64::try_from(n)
            .map(|n| n * BLOCK_SIZE as u64)
            .map_err(|_| CairnError::Invariant(format!("negative block number {}", n)))
    }
}
