//! Buffer Writer
//!
//! Appends encoded values to a bounded byte slice.

use bytes::BufMut;

use crate::error::{CairnError, Result};

use super::Storable;

/// Bounded writer over a mutable byte region
pub struct BufferWriter<'a> {
    /// Unwritten tail of the region (advances as bytes are written)
    remaining: &'a mut [u8],
    /// Total size of the region
    capacity: usize,
}

impl<'a> BufferWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        let capacity = buf.len();
        Self {
            remaining: buf,
            capacity,
        }
    }

    /// Bytes written so far
    pub fn position(&self) -> usize {
        self.capacity - self.remaining.len()
    }

    /// Bytes still available
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.ensure(1)?;
        self.remaining.put_u8(v);
        Ok(())
    }

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(u8::from(v))
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.ensure(4)?;
        self.remaining.put_i32_le(v);
        Ok(())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.ensure(8)?;
        self.remaining.put_u64_le(v);
        Ok(())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.ensure(4)?;
        self.remaining.put_f32_le(v);
        Ok(())
    }

    /// Write a collection length as a size-word
    pub fn write_len(&mut self, len: usize) -> Result<()> {
        self.write_u64(len as u64)
    }

    /// Write `[len: u64][bytes]`
    ///
    /// The whole string is checked up front so a too-long string leaves
    /// no dangling length prefix behind.
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.ensure(8 + s.len())?;
        self.remaining.put_u64_le(s.len() as u64);
        self.remaining.put_slice(s.as_bytes());
        Ok(())
    }

    /// Write any storable record
    pub fn write<T: Storable>(&mut self, item: &T) -> Result<()> {
        item.serialize(self)
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining.remaining_mut() < needed {
            return Err(CairnError::BufferOverrun {
                needed,
                available: self.remaining.len(),
            });
        }
        Ok(())
    }
}
