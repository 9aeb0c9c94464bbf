//! Value Module
//!
//! Typed, tagged values stored in rows and attribute defaults.
//!
//! ## Variants
//!
//! | Variant | Rust Type | On-disk tag |
//! |---------|-----------|-------------|
//! | Null    | -         | `N`         |
//! | Int     | i32       | `I`         |
//! | Float   | f32       | `F`         |
//! | Bool    | bool      | `B`         |
//! | Varchar | String    | `V`         |
//!
//! ## Encoding
//! ```text
//! ┌─────────┬──────────────────┬─────────────────────┐
//! │ Tag (1) │ Text len (u64)   │ Text (display form) │
//! └─────────┴──────────────────┴─────────────────────┘
//! ```
//! The payload is always the textual form of the value, whatever its type.
//!
//! ## Comparison
//! - Null is neither equal to nor ordered against anything, itself included
//! - Equality across different types is `false`
//! - Ordering across different types is an error (`IncomparableTypes`)

mod convert;

use std::cmp::Ordering;
use std::fmt;

use crate::codec::{BufferReader, BufferWriter, Storable};
use crate::error::{CairnError, Result};

// =============================================================================
// DataType
// =============================================================================

/// The declared type of a value or attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Null,
    Int,
    Float,
    Bool,
    Varchar,
}

impl DataType {
    /// On-disk tag byte
    pub fn tag(self) -> u8 {
        match self {
            DataType::Null => b'N',
            DataType::Int => b'I',
            DataType::Float => b'F',
            DataType::Bool => b'B',
            DataType::Varchar => b'V',
        }
    }

    /// Parse an on-disk tag byte
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'N' => Some(DataType::Null),
            b'I' => Some(DataType::Int),
            b'F' => Some(DataType::Float),
            b'B' => Some(DataType::Bool),
            b'V' => Some(DataType::Varchar),
            _ => None,
        }
    }

    /// Zero-valued default of this type (what Null converts into)
    pub fn zero_value(self) -> Value {
        match self {
            DataType::Null => Value::Null,
            DataType::Int => Value::Int(0),
            DataType::Float => Value::Float(0.0),
            DataType::Bool => Value::Bool(false),
            DataType::Varchar => Value::Varchar(String::new()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Null => "null",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Bool => "bool",
            DataType::Varchar => "varchar",
        };
        f.write_str(name)
    }
}

impl Storable for DataType {
    fn serialize(&self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_u8(self.tag())
    }

    fn deserialize(reader: &mut BufferReader<'_>) -> Result<Self> {
        let tag = reader.read_u8()?;
        DataType::from_tag(tag)
            .ok_or_else(|| CairnError::Corrupt(format!("unknown value type tag 0x{:02x}", tag)))
    }
}

// =============================================================================
// Value
// =============================================================================

/// A single typed value
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Int(i32),
    Float(f32),
    Bool(bool),
    Varchar(String),
}

impl Value {
    /// Get the type tag of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Bool(_) => DataType::Bool,
            Value::Varchar(_) => DataType::Varchar,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Varchar(v) => Some(v),
            _ => None,
        }
    }

    /// Compare two values of the same type.
    ///
    /// Returns:
    /// - `Ok(None)`: either side is Null (or a float is NaN)
    /// - `Ok(Some(ordering))`: both sides share a type
    /// - `Err(IncomparableTypes)`: the types differ
    pub fn compare(&self, other: &Value) -> Result<Option<Ordering>> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Ok(None),
            (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
            (Value::Float(a), Value::Float(b)) => Ok(a.partial_cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),
            (Value::Varchar(a), Value::Varchar(b)) => Ok(Some(a.cmp(b))),
            _ => Err(CairnError::IncomparableTypes {
                left: self.data_type(),
                right: other.data_type(),
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.compare(other), Ok(Some(Ordering::Equal)))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other).ok().flatten()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Varchar(v) => f.write_str(v),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Varchar(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Varchar(v.to_string())
    }
}

impl Storable for Value {
    fn serialize(&self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write(&self.data_type())?;
        writer.write_str(&self.to_string())
    }

    fn deserialize(reader: &mut BufferReader<'_>) -> Result<Self> {
        let data_type: DataType = reader.read()?;
        let text = reader.read_string()?;

        if data_type == DataType::Null {
            return Ok(Value::Null);
        }

        Value::Varchar(text)
            .convert(data_type)
            .map_err(|e| CairnError::Corrupt(format!("stored value does not decode: {}", e)))
    }
}
