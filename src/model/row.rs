//! Row
//!
//! ## Layout (tag `R`)
//! ```text
//! [count: u64] then count × [field name: str][value]
//! ```

use std::collections::BTreeMap;

use crate::codec::{BufferReader, BufferWriter, Storable};
use crate::error::{CairnError, Result};
use crate::storage::{BlockNumber, BlockType, MonoStorable};
use crate::value::Value;

/// One stored record
#[derive(Debug, Clone, Default)]
pub struct Row {
    block_number: BlockNumber,
    fields: BTreeMap<String, Value>,
}

impl Row {
    pub fn new(block_number: BlockNumber) -> Self {
        Self {
            block_number,
            fields: BTreeMap::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Fields in name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replace the value of an existing field.
    ///
    /// Updates never add fields; the row's shape is fixed by its Entity.
    pub fn update_field(&mut self, field: &str, value: Value) -> Result<()> {
        match self.fields.get_mut(field) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(CairnError::Invariant(format!(
                "row {} has no field '{}'",
                self.block_number, field
            ))),
        }
    }

    pub(crate) fn set_field(&mut self, field: &str, value: Value) {
        self.fields.insert(field.to_string(), value);
    }
}

impl Storable for Row {
    fn serialize(&self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_len(self.fields.len())?;
        for (name, value) in &self.fields {
            writer.write_str(name)?;
            writer.write(value)?;
        }
        Ok(())
    }

    fn deserialize(reader: &mut BufferReader<'_>) -> Result<Self> {
        let count = reader.read_len()?;
        let mut fields = BTreeMap::new();
        for _ in 0..count {
            let name = reader.read_string()?;
            let value: Value = reader.read()?;
            fields.insert(name, value);
        }
        Ok(Self {
            block_number: 0,
            fields,
        })
    }
}

impl MonoStorable for Row {
    fn expected_block_type() -> BlockType {
        BlockType::Row
    }

    fn block_number(&self) -> BlockNumber {
        self.block_number
    }

    fn set_block_number(&mut self, block_number: BlockNumber) {
        self.block_number = block_number;
    }
}
