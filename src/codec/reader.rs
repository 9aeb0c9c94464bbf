//! Buffer Reader
//!
//! Decodes values from a bounded byte slice, mirroring [`super::BufferWriter`].

use bytes::Buf;

use crate::error::{CairnError, Result};

use super::Storable;

/// Bounded reader over a byte region
pub struct BufferReader<'a> {
    /// Unread tail of the region
    remaining: &'a [u8],
    capacity: usize,
}

impl<'a> BufferReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            remaining: buf,
            capacity: buf.len(),
        }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.capacity - self.remaining.len()
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.remaining.get_u8())
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CairnError::Corrupt(format!("invalid bool byte {}", other))),
        }
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.remaining.get_i32_le())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.remaining.get_u64_le())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.ensure(4)?;
        Ok(self.remaining.get_f32_le())
    }

    /// Read a size-word written by `write_len`.
    ///
    /// A length that could not possibly fit in the rest of the region is
    /// reported as an overrun instead of driving a huge allocation.
    pub fn read_len(&mut self) -> Result<usize> {
        let len = self.read_u64()?;
        usize::try_from(len)
            .ok()
            .filter(|len| *len <= self.capacity)
            .ok_or(CairnError::BufferOverrun {
                needed: usize::MAX,
                available: self.remaining.len(),
            })
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        self.ensure(len)?;
        let (bytes, rest) = self.remaining.split_at(len);
        self.remaining = rest;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CairnError::Corrupt(format!("invalid UTF-8 in string: {}", e)))
    }

    /// Read any storable record
    pub fn read<T: Storable>(&mut self) -> Result<T> {
        T::deserialize(self)
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining.remaining() < needed {
            return Err(CairnError::BufferOverrun {
                needed,
                available: self.remaining.len(),
            });
        }
        Ok(())
    }
}
