//! Entity
//!
//! Persisted table metadata: attributes, auto-increment counter and the
//! blocks holding the table's rows.
//!
//! ## Layout (tag `E`)
//! ```text
//! [attr count: u64]
//!   attr count × [name: str][type tag: u8][default: value]
//!                [nullable: u8][primary: u8][auto_increment: u8]
//! [auto-increment counter: i32]
//! [row count: u64] then row count × [block: i32]
//! ```

use std::collections::HashSet;

use crate::codec::{BufferReader, BufferWriter, Storable};
use crate::error::{CairnError, Result};
use crate::storage::{Block, BlockNumber, BlockType, MonoStorable};
use crate::value::{DataType, Value};

use super::Row;

// =============================================================================
// Attribute
// =============================================================================

/// A column definition
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    data_type: DataType,
    default: Value,
    nullable: bool,
    primary: bool,
    auto_increment: bool,
}

impl Attribute {
    /// Nullable attribute with a Null default
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            default: Value::Null,
            nullable: true,
            primary: false,
            auto_increment: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Primary keys are never nullable
    pub fn primary_key(mut self) -> Self {
        self.primary = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn default(&self) -> &Value {
        &self.default
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// Turn user text into a value of this attribute's type
    pub fn parse_value(&self, text: &str) -> Result<Value> {
        let value =
            Value::parse_literal(text, self.data_type).map_err(|_| CairnError::TypeMismatch {
                attribute: self.name.clone(),
                expected: self.data_type,
                value: text.to_string(),
            })?;

        if value.is_null() && !self.nullable {
            return Err(CairnError::InvalidArguments(format!(
                "attribute '{}' is not nullable",
                self.name
            )));
        }
        Ok(value)
    }
}

impl Storable for Attribute {
    fn serialize(&self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_str(&self.name)?;
        writer.write(&self.data_type)?;
        writer.write(&self.default)?;
        writer.write_bool(self.nullable)?;
        writer.write_bool(self.primary)?;
        writer.write_bool(self.auto_increment)
    }

    fn deserialize(reader: &mut BufferReader<'_>) -> Result<Self> {
        Ok(Self {
            name: reader.read_string()?,
            data_type: reader.read()?,
            default: reader.read()?,
            nullable: reader.read_bool()?,
            primary: reader.read_bool()?,
            auto_increment: reader.read_bool()?,
        })
    }
}

// =============================================================================
// Entity
// =============================================================================

/// Table metadata
#[derive(Debug, Clone)]
pub struct Entity {
    block_number: BlockNumber,
    attributes: Vec<Attribute>,
    /// Last issued auto-increment value
    auto_increment: i32,
    row_positions: Vec<BlockNumber>,
    dirty: bool,
}

impl Entity {
    /// Build a new, not yet persisted, Entity.
    ///
    /// Validates the schema:
    /// - at least one attribute, names non-empty and unique
    /// - at most one auto-increment attribute, which must be an Int primary key
    /// - every non-null default converts to its attribute's type
    pub fn new(block_number: BlockNumber, attributes: Vec<Attribute>) -> Result<Self> {
        if attributes.is_empty() {
            return Err(CairnError::InvalidArguments(
                "a table needs at least one attribute".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut auto_increment_count = 0;
        let mut attributes = attributes;

        for attribute in attributes.iter_mut() {
            if attribute.name.is_empty() {
                return Err(CairnError::InvalidArguments(
                    "attribute names cannot be empty".to_string(),
                ));
            }
            if !seen.insert(attribute.name.clone()) {
                return Err(CairnError::DuplicateAttribute(attribute.name.clone()));
            }

            if attribute.auto_increment {
                auto_increment_count += 1;
                if attribute.data_type != DataType::Int || !attribute.primary {
                    return Err(CairnError::InvalidArguments(format!(
                        "auto-increment attribute '{}' must be an int primary key",
                        attribute.name
                    )));
                }
            }

            if !attribute.default.is_null() {
                let declared = attribute.data_type;
                attribute.default.become_type(declared).map_err(|_| {
                    CairnError::TypeMismatch {
                        attribute: attribute.name.clone(),
                        expected: declared,
                        value: attribute.default.to_string(),
                    }
                })?;
            }
        }

        if auto_increment_count > 1 {
            return Err(CairnError::InvalidArguments(
                "only one attribute can be auto-increment".to_string(),
            ));
        }

        Ok(Self {
            block_number,
            attributes,
            auto_increment: 0,
            row_positions: Vec::new(),
            dirty: true,
        })
    }

    // =========================================================================
    // Schema
    // =========================================================================

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Like `attribute`, but a missing name is an `UnknownAttribute` error
    pub fn require_attribute(&self, name: &str) -> Result<&Attribute> {
        self.attribute(name)
            .ok_or_else(|| CairnError::UnknownAttribute(name.to_string()))
    }

    /// Attribute names in declaration order
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.name.clone()).collect()
    }

    // =========================================================================
    // Auto Increment
    // =========================================================================

    /// Last value handed out
    pub fn auto_increment_counter(&self) -> i32 {
        self.auto_increment
    }

    /// Bump the counter and return the new value
    pub fn next_auto_increment(&mut self) -> Result<i32> {
        self.auto_increment = self
            .auto_increment
            .checked_add(1)
            .ok_or_else(|| CairnError::InvalidArguments("auto-increment overflow".to_string()))?;
        self.dirty = true;
        Ok(self.auto_increment)
    }

    // =========================================================================
    // Row Generation
    // =========================================================================

    /// Validate user input and build a complete row.
    ///
    /// 1. Every supplied field must name an attribute; its text is converted
    ///    to the attribute's type.
    /// 2. Every omitted attribute that is neither nullable, auto-increment,
    ///    nor has a default rejects the row.
    /// 3. Omitted attributes are filled: auto-increment draws the next
    ///    counter value, everything else takes its default.
    ///
    /// Nothing (including the counter) changes unless a row is returned.
    pub fn generate_new_row<F, V>(&mut self, field_names: &[F], values: &[V]) -> Result<Row>
    where
        F: AsRef<str>,
        V: AsRef<str>,
    {
        if field_names.len() != values.len() {
            return Err(CairnError::InvalidArguments(format!(
                "{} fields but {} values",
                field_names.len(),
                values.len()
            )));
        }

        let mut row = Row::new(0);
        let mut explicit_auto_increment = None;

        for (field, text) in field_names.iter().zip(values) {
            let field = field.as_ref();
            let attribute = self.require_attribute(field)?;
            if row.contains(field) {
                return Err(CairnError::InvalidArguments(format!(
                    "field '{}' given more than once",
                    field
                )));
            }

            let value = attribute.parse_value(text.as_ref())?;
            if attribute.auto_increment {
                explicit_auto_increment = value.as_int();
            }
            row.set_field(field, value);
        }

        if let Some(missing) = self.attributes.iter().find(|a| {
            !row.contains(&a.name) && !a.nullable && !a.auto_increment && a.default.is_null()
        }) {
            return Err(CairnError::InvalidArguments(format!(
                "attribute '{}' is not nullable and has no value",
                missing.name
            )));
        }

        if let Some(v) = explicit_auto_increment {
            if v > self.auto_increment {
                self.auto_increment = v;
                self.dirty = true;
            }
        }

        for index in 0..self.attributes.len() {
            if row.contains(&self.attributes[index].name) {
                continue;
            }
            let value = if self.attributes[index].auto_increment {
                Value::Int(self.next_auto_increment()?)
            } else {
                self.attributes[index].default.clone()
            };
            row.set_field(&self.attributes[index].name, value);
        }

        Ok(row)
    }

    // =========================================================================
    // Row Positions
    // =========================================================================

    pub fn row_positions(&self) -> &[BlockNumber] {
        &self.row_positions
    }

    pub fn row_count(&self) -> usize {
        self.row_positions.len()
    }

    /// Record a row block; the block must not be recorded already
    pub fn add_row_position(&mut self, block_number: BlockNumber) -> Result<()> {
        if self.row_positions.contains(&block_number) {
            return Err(CairnError::Invariant(format!(
                "row block {} is already recorded",
                block_number
            )));
        }
        self.row_positions.push(block_number);
        self.dirty = true;
        Ok(())
    }

    /// Whether the Entity still fits in one block after `additional` more
    /// row positions
    pub fn has_room_for(&self, additional: usize) -> Result<bool> {
        let mut grown = self.clone();
        grown
            .row_positions
            .resize(self.row_positions.len() + additional, 0);
        match Block::encode(&grown) {
            Ok(_) => Ok(true),
            Err(CairnError::BufferOverrun { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Forget a row block; the block must be recorded
    pub fn drop_row_position(&mut self, block_number: BlockNumber) -> Result<()> {
        let index = self
            .row_positions
            .iter()
            .position(|&n| n == block_number)
            .ok_or_else(|| {
                CairnError::Invariant(format!("row block {} is not recorded", block_number))
            })?;
        self.row_positions.remove(index);
        self.dirty = true;
        Ok(())
    }

    // =========================================================================
    // Dirty Tracking
    // =========================================================================

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Called after the Entity has been written
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl Storable for Entity {
    fn serialize(&self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_len(self.attributes.len())?;
        for attribute in &self.attributes {
            writer.write(attribute)?;
        }
        writer.write_i32(self.auto_increment)?;
        writer.write_len(self.row_positions.len())?;
        for n in &self.row_positions {
            writer.write_i32(*n)?;
        }
        Ok(())
    }

    fn deserialize(reader: &mut BufferReader<'_>) -> Result<Self> {
        let attribute_count = reader.read_len()?;
        let mut attributes = Vec::with_capacity(attribute_count);
        for _ in 0..attribute_count {
            attributes.push(reader.read()?);
        }

        let auto_increment = reader.read_i32()?;

        let row_count = reader.read_len()?;
        let mut row_positions = Vec::with_capacity(row_count);
        for _ in 0..row_count {
            row_positions.push(reader.read_i32()?);
        }

        Ok(Self {
            block_number: 0,
            attributes,
            auto_increment,
            row_positions,
            dirty: false,
        })
    }
}

impl MonoStorable for Entity {
    fn expected_block_type() -> BlockType {
        BlockType::Entity
    }

    fn block_number(&self) -> BlockNumber {
        self.block_number
    }

    fn set_block_number(&mut self, block_number: BlockNumber) {
        self.block_number = block_number;
    }
}
