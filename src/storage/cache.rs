//! Block Cache
//!
//! Bounded LRU cache of decoded blocks, keyed by block number.
//!
//! ## Data Structure
//! ```text
//!  index: HashMap<BlockNumber, slot>
//!            │
//!            ▼
//!  nodes: [ slot0 | slot1 | slot2 | ... ]   (slab, reused via free_slots)
//!
//!  head (MRU) ⇄ ... ⇄ tail (LRU)            (doubly linked through slots)
//! ```
//! Every operation is O(1). The cache is write-through: [`super::Storage`]
//! writes to disk first and then refreshes the cached copy, so evicting an
//! entry never loses data.

use std::collections::HashMap;

use crate::error::{CairnError, Result};

use super::{Block, BlockNumber};

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Node {
    block_number: BlockNumber,
    block: Block,
    /// Towards the head (more recently used)
    prev: Option<usize>,
    /// Towards the tail (less recently used)
    next: Option<usize>,
}

/// LRU cache of blocks
pub struct BlockCache {
    capacity: usize,
    index: HashMap<BlockNumber, usize>,
    nodes: Vec<Node>,
    free_slots: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    stats: CacheStats,
}

impl BlockCache {
    /// Create a cache holding at most `capacity` blocks.
    ///
    /// A capacity of 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            index: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            free_slots: Vec::new(),
            head: None,
            tail: None,
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check membership without touching recency
    pub fn contains(&self, block_number: BlockNumber) -> bool {
        self.index.contains_key(&block_number)
    }

    /// Insert a block, or replace and touch an existing entry.
    ///
    /// Evicts the least recently used entry when over capacity.
    pub fn put(&mut self, block_number: BlockNumber, block: Block) {
        if self.capacity == 0 {
            return;
        }

        if let Some(&slot) = self.index.get(&block_number) {
            self.nodes[slot].block = block;
            self.touch(slot);
            return;
        }

        let node = Node {
            block_number,
            block,
            prev: None,
            next: None,
        };
        let slot = match self.free_slots.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.index.insert(block_number, slot);
        self.push_front(slot);

        if self.index.len() > self.capacity {
            self.evict_tail();
        }
    }

    /// Return a cached block and mark it most recently used.
    ///
    /// The block must be present; check with [`BlockCache::contains`] first.
    pub fn get(&mut self, block_number: BlockNumber) -> Result<Block> {
        self.lookup(block_number).ok_or_else(|| {
            CairnError::Invariant(format!("block {} is not cached", block_number))
        })
    }

    /// Like `get`, but a miss is an ordinary `None`
    pub fn lookup(&mut self, block_number: BlockNumber) -> Option<Block> {
        match self.index.get(&block_number) {
            Some(&slot) => {
                self.stats.hits += 1;
                self.touch(slot);
                Some(self.nodes[slot].block)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Drop an entry if present
    pub fn remove(&mut self, block_number: BlockNumber) -> Option<Block> {
        let slot = self.index.remove(&block_number)?;
        self.unlink(slot);
        self.free_slots.push(slot);
        Some(self.nodes[slot].block)
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.free_slots.clear();
        self.head = None;
        self.tail = None;
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Block numbers from most to least recently used
    pub fn recency_order(&self) -> Vec<BlockNumber> {
        let mut order = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            order.push(self.nodes[slot].block_number);
            cursor = self.nodes[slot].next;
        }
        order
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn touch(&mut self, slot: usize) {
        if self.head == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.push_front(slot);
    }

    fn evict_tail(&mut self) {
        if let Some(slot) = self.tail {
            let block_number = self.nodes[slot].block_number;
            self.unlink(slot);
            self.index.remove(&block_number);
            self.free_slots.push(slot);
            self.stats.evictions += 1;
        }
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);

        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }

        self.nodes[slot].prev = None;
        self.nodes[slot].next = None;
    }

    fn push_front(&mut self, slot: usize) {
        self.nodes[slot].prev = None;
        self.nodes[slot].next = self.head;
        if let Some(old_head) = self.head {
            self.nodes[old_head].prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }
}
