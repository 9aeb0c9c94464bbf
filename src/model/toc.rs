//! Table of Contents
//!
//! ## Layout (block 0, tag `C`)
//! ```text
//! [count: u64] then count × [name: str][entity block: i32]
//! ```

use std::collections::BTreeMap;

use crate::codec::{BufferReader, BufferWriter, Storable};
use crate::error::{CairnError, Result};
use crate::storage::{BlockNumber, BlockType, MonoStorable, TOC_BLOCK};

/// Directory of tables in a database file
#[derive(Debug, Clone, Default)]
pub struct Toc {
    tables: BTreeMap<String, BlockNumber>,
    dirty: bool,
}

impl Toc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Block holding the Entity of `name`; the table must exist
    pub fn block_number_of(&self, name: &str) -> Result<BlockNumber> {
        self.tables
            .get(name)
            .copied()
            .ok_or_else(|| CairnError::Invariant(format!("TOC has no entry for '{}'", name)))
    }

    /// Register a new table; the name must not be present yet
    pub fn add(&mut self, name: &str, block_number: BlockNumber) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(CairnError::Invariant(format!(
                "TOC already has an entry for '{}'",
                name
            )));
        }
        self.tables.insert(name.to_string(), block_number);
        self.dirty = true;
        Ok(())
    }

    /// Unregister a table and return its Entity block; the name must exist
    pub fn remove(&mut self, name: &str) -> Result<BlockNumber> {
        let block_number = self
            .tables
            .remove(name)
            .ok_or_else(|| CairnError::Invariant(format!("TOC has no entry for '{}'", name)))?;
        self.dirty = true;
        Ok(block_number)
    }

    /// Table names in sorted order
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, BlockNumber)> {
        self.tables.iter().map(|(name, n)| (name.as_str(), *n))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called after the TOC has been written
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl Storable for Toc {
    fn serialize(&self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_len(self.tables.len())?;
        for (name, block_number) in &self.tables {
            writer.write_str(name)?;
            writer.write_i32(*block_number)?;
        }
        Ok(())
    }

    fn deserialize(reader: &mut BufferReader<'_>) -> Result<Self> {
        let count = reader.read_len()?;
        let mut tables = BTreeMap::new();
        for _ in 0..count {
            let name = reader.read_string()?;
            let block_number = reader.read_i32()?;
            if tables.insert(name.clone(), block_number).is_some() {
                return Err(CairnError::Corrupt(format!(
                    "duplicate TOC entry for '{}'",
                    name
                )));
            }
        }
        Ok(Self {
            tables,
            dirty: false,
        })
    }
}

impl MonoStorable for Toc {
    fn expected_block_type() -> BlockType {
        BlockType::Toc
    }

    fn block_number(&self) -> BlockNumber {
        TOC_BLOCK
    }

    /// The TOC never moves
    fn set_block_number(&mut self, _block_number: BlockNumber) {}
}
