//! Codec Module
//!
//! Cursor-style binary encoding over a fixed-size byte region (usually the
//! payload of one block).
//!
//! ## Responsibilities
//! - Fixed-width little-endian scalars (no varints)
//! - Length-prefixed strings: `[len: u64][raw UTF-8 bytes]`, no terminator
//! - Recursive encoding of anything implementing [`Storable`]
//! - Hard bounds: reading or writing past the end of the region is a
//!   `BufferOverrun` error, never a silent truncation

mod reader;
mod writer;

pub use reader::BufferReader;
pub use writer::BufferWriter;

use crate::error::Result;

/// A logical record that can be written to and read back from a buffer
pub trait Storable: Sized {
    /// Append this record to the writer
    fn serialize(&self, writer: &mut BufferWriter<'_>) -> Result<()>;

    /// Read a record previously written by [`Storable::serialize`]
    fn deserialize(reader: &mut BufferReader<'_>) -> Result<Self>;
}

impl Storable for String {
    fn serialize(&self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_str(self)
    }

    fn deserialize(reader: &mut BufferReader<'_>) -> Result<Self> {
        reader.read_string()
    }
}

impl Storable for i32 {
    fn serialize(&self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_i32(*self)
    }

    fn deserialize(reader: &mut BufferReader<'_>) -> Result<Self> {
        reader.read_i32()
    }
}

impl Storable for bool {
    fn serialize(&self, writer: &mut BufferWriter<'_>) -> Result<()> {
        writer.write_bool(*self)
    }

    fn deserialize(reader: &mut BufferReader<'_>) -> Result<Self> {
        reader.read_bool()
    }
}
