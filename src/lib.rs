//! # CairnDB
//!
//! A single-file relational storage engine with:
//! - Fixed 1024-byte blocks, each tagged with its record type
//! - A write-through LRU block cache
//! - Typed values with explicit, checked conversions
//! - Table metadata (Entities) indexed by a table of contents at block 0
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DatabaseManager                          │
//! │          (name → file, one active database)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Database                              │
//! │        (TOC + Entity cache, create/insert/select)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Model    │          │   Storage   │
//!   │ TOC/Entity/ │─encode──▶│ (block I/O) │
//!   │    Row      │          └──────┬──────┘
//!   └─────────────┘                 │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │ BlockCache  │
//!                           │   (LRU)     │
//!                           └─────────────┘
//! ```
//!
//! Single-threaded and synchronous: one process, one writer, no
//! transactions and no write-ahead log.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod value;
pub mod codec;
pub mod storage;
pub mod model;
pub mod database;
pub mod manager;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CairnError, Result};
pub use config::{Config, SyncStrategy};
pub use database::{Comparison, Database, Filter, OrderBy, RowCollection, SelectQuery};
pub use manager::DatabaseManager;
pub use model::{Attribute, Entity, Row, Toc};
pub use value::{DataType, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of CairnDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
