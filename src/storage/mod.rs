//! Storage Module
//!
//! Fixed-size block storage over a single database file.
//!
//! ## Responsibilities
//! - Map block numbers to file offsets (`n * BLOCK_SIZE`)
//! - Read/write whole blocks through a write-through LRU cache
//! - Find free blocks by linear scan (no persisted free list)
//! - Sequential and subset traversal with early stop
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────┐  offset 0
//! │ Block 0: TOC                  │
//! │ ┌─────────┬─────────────────┐ │
//! │ │ Tag (1) │ Payload (1023)  │ │
//! │ └─────────┴─────────────────┘ │
//! ├───────────────────────────────┤  offset 1024
//! │ Block 1: Entity / Row / Free  │
//! ├───────────────────────────────┤
//! │ ...                           │
//! └───────────────────────────────┘
//! ```
//! Tags: `C` = TOC, `E` = Entity, `I` = Index (reserved), `R` = Row, `F` = Free.

mod block;
mod cache;
mod manager;

pub use block::{Block, BlockType, MonoStorable};
pub use cache::{BlockCache, CacheStats};
pub use manager::Storage;

// =============================================================================
// Shared Constants
// =============================================================================

/// Size of every block on disk
pub const BLOCK_SIZE: usize = 1024;

/// Bytes available to a record after the tag byte
pub const PAYLOAD_SIZE: usize = BLOCK_SIZE - 1;

/// Default number of cached blocks
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Zero-based position of a block in the database file.
///
/// Block 0 always holds the TOC.
pub type BlockNumber = i32;

/// Block number of the table of contents
pub const TOC_BLOCK: BlockNumber = 0;

/// Signal returned by block visitors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Keep traversing
    Continue,
    /// Stop early (not an error)
    Stop,
}
