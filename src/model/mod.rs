//! Model Module
//!
//! Logical records persisted one per block.
//!
//! - [`Toc`]: table name → Entity block, always at block 0
//! - [`Entity`]: table schema, auto-increment counter and row positions
//! - [`Row`]: field name → value mapping

mod entity;
mod row;
mod toc;

pub use entity::{Attribute, Entity};
pub use row::Row;
pub use toc::Toc;
