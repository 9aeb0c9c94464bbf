//! Error types for CairnDB
//!
//! Provides a unified error type for all operations.
//!
//! Errors fall into two classes:
//! - **User-facing** conditions (unknown table, type mismatch, ...). The
//!   operation is aborted before anything is written.
//! - **Fatal** conditions (I/O failure, corrupt block, violated internal
//!   invariant). The database file may be inconsistent; see [`CairnError::is_fatal`].

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::{BlockNumber, BlockType};
use crate::value::DataType;

/// Result type alias using CairnError
pub type Result<T> = std::result::Result<T, CairnError>;

/// Unified error type for CairnDB operations
#[derive(Debug, Error)]
pub enum CairnError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open database file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to seek to block {block}: {source}")]
    Seek {
        block: BlockNumber,
        source: std::io::Error,
    },

    #[error("Failed to read block {block}: {source}")]
    Read {
        block: BlockNumber,
        source: std::io::Error,
    },

    #[error("Failed to write block {block}: {source}")]
    Write {
        block: BlockNumber,
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Block type mismatch: expected {expected:?}, found {found:?}")]
    BlockTypeMismatch {
        expected: BlockType,
        found: BlockType,
    },

    #[error("Unknown block type tag: 0x{0:02x}")]
    UnknownBlockType(u8),

    #[error("Buffer overrun: needed {needed} bytes, {available} available")]
    BufferOverrun { needed: usize, available: usize },

    #[error("Corrupt data: {0}")]
    Corrupt(String),

    #[error("Internal invariant violated: {0}")]
    Invariant(String),

    // -------------------------------------------------------------------------
    // Catalog Errors
    // -------------------------------------------------------------------------
    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Duplicate attribute: {0}")]
    DuplicateAttribute(String),

    // -------------------------------------------------------------------------
    // Data Errors
    // -------------------------------------------------------------------------
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Type mismatch for attribute {attribute}: expected {expected}, got '{value}'")]
    TypeMismatch {
        attribute: String,
        expected: DataType,
        value: String,
    },

    #[error("Cannot convert '{value}' from {from} to {to}")]
    ConversionFailed {
        from: DataType,
        to: DataType,
        value: String,
    },

    #[error("Row does not fit in one block for table {0}")]
    RowTooLarge(String),

    #[error("Table {table} cannot hold {additional} more rows")]
    TableFull { table: String, additional: usize },

    #[error("Cannot compare {left} with {right}")]
    IncomparableTypes { left: DataType, right: DataType },

    // -------------------------------------------------------------------------
    // Database Manager Errors
    // -------------------------------------------------------------------------
    #[error("Database already exists: {0}")]
    DatabaseExists(String),

    #[error("Unknown database: {0}")]
    UnknownDatabase(String),

    #[error("No database in use")]
    NoActiveDatabase,

    #[error("Invalid database name: '{0}'")]
    InvalidDatabaseName(String),
}

impl CairnError {
    /// Whether this error signals corruption, a broken internal invariant or
    /// an I/O fault.
    ///
    /// A `Database` that returned a fatal error must not be used for further
    /// operations; drop it and reopen the file. Inserts check record sizes
    /// before writing and report `RowTooLarge` / `TableFull` instead of
    /// `BufferOverrun`, so those are safe to continue past.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CairnError::Io(_)
                | CairnError::Open { .. }
                | CairnError::Seek { .. }
                | CairnError::Read { .. }
                | CairnError::Write { .. }
                | CairnError::BlockTypeMismatch { .. }
                | CairnError::UnknownBlockType(_)
                | CairnError::BufferOverrun { .. }
                | CairnError::Corrupt(_)
                | CairnError::Invariant(_)
        )
    }
}
