//! Block
//!
//! A fixed 1024-byte unit: one tag byte followed by an opaque payload.

use std::fmt;

use crate::codec::{BufferReader, BufferWriter, Storable};
use crate::error::{CairnError, Result};

use super::{BlockNumber, BLOCK_SIZE};

const _: () = assert!(std::mem::size_of::<Block>() == BLOCK_SIZE);

/// Kind of record stored in a block (byte 0 on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockType {
    Toc = b'C',
    Entity = b'E',
    /// Reserved, never written
    Index = b'I',
    Row = b'R',
    Free = b'F',
}

impl BlockType {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            b'C' => Ok(BlockType::Toc),
            b'E' => Ok(BlockType::Entity),
            b'I' => Ok(BlockType::Index),
            b'R' => Ok(BlockType::Row),
            b'F' => Ok(BlockType::Free),
            other => Err(CairnError::UnknownBlockType(other)),
        }
    }
}

/// A record that owns exactly one block
pub trait MonoStorable: Storable {
    /// Tag every block holding this record must carry
    fn expected_block_type() -> BlockType;

    /// Block the record lives in
    fn block_number(&self) -> BlockNumber;

    fn set_block_number(&mut self, block_number: BlockNumber);
}

/// One on-disk block
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Block {
    bytes: [u8; BLOCK_SIZE],
}

impl Block {
    /// Empty block with the given tag
    pub fn new(block_type: BlockType) -> Self {
        let mut bytes = [0u8; BLOCK_SIZE];
        bytes[0] = block_type as u8;
        Self { bytes }
    }

    /// Raw block as read from disk; the tag is validated on access
    pub fn from_bytes(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self { bytes }
    }

    /// Encode a record into a fresh block tagged with its expected type.
    ///
    /// Fails with `BufferOverrun` if the record does not fit in the payload.
    pub fn encode<T: MonoStorable>(item: &T) -> Result<Self> {
        let mut block = Block::new(T::expected_block_type());
        let mut writer = BufferWriter::new(block.payload_mut());
        item.serialize(&mut writer)?;
        Ok(block)
    }

    /// Decode the record stored in this block.
    ///
    /// The stored tag must match `T::expected_block_type()`; a mismatch means
    /// the file is corrupt or the block number was wrong.
    pub fn decode<T: MonoStorable>(&self) -> Result<T> {
        let found = self.block_type()?;
        let expected = T::expected_block_type();
        if found != expected {
            return Err(CairnError::BlockTypeMismatch { expected, found });
        }
        let mut reader = BufferReader::new(self.payload());
        T::deserialize(&mut reader)
    }

    pub fn block_type(&self) -> Result<BlockType> {
        BlockType::from_byte(self.bytes[0])
    }

    /// Raw tag byte, whether or not it names a known block type
    pub fn tag(&self) -> u8 {
        self.bytes[0]
    }

    pub fn is_free(&self) -> bool {
        self.bytes[0] == BlockType::Free as u8
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.bytes
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[1..]
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::new(BlockType::Free)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("tag", &(self.bytes[0] as char))
            .field("payload_len", &self.payload().len())
            .finish()
    }
}
