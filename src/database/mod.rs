//! Database Module
//!
//! Composition root over one database file.
//!
//! ## Responsibilities
//! - Own the Storage, the TOC and the in-memory Entity cache
//! - Create/drop tables, insert/select/update/delete rows
//! - Validate every request before anything is written
//! - Flush the TOC and dirty Entities on `flush`, `close` and drop
//!
//! ## Write Ordering
//! - `create_table`: Entity block, then TOC
//! - `drop_table`: TOC, then Entity and row blocks
//! - inserts: row block, then row position in the cached Entity
//!
//! A crash between steps can leak blocks but never leaves the TOC
//! pointing at a block that is not an Entity.

mod query;

pub use query::{Comparison, Filter, OrderBy, RowCollection, SelectQuery};

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{CairnError, Result};
use crate::model::{Attribute, Entity, Row, Toc};
use crate::storage::{Block, BlockNumber, CacheStats, MonoStorable, Storage, Visit, TOC_BLOCK};

use query::compare_rows;

/// An open database file
///
/// ## Ownership
/// - Exactly one `Storage` (file handle + block cache)
/// - Exactly one `Toc`
/// - At most one cached `Entity` per table, loaded on first use
pub struct Database {
    storage: Storage,
    toc: Toc,
    entities: HashMap<String, Entity>,
}

impl Database {
    /// Create a new database file (truncating any existing one)
    pub fn create(path: &Path, config: &Config) -> Result<Self> {
        let toc = Toc::new();
        let storage = Storage::create(path, &toc, config)?;
        Ok(Self {
            storage,
            toc,
            entities: HashMap::new(),
        })
    }

    /// Open an existing database file
    pub fn open(path: &Path, config: &Config) -> Result<Self> {
        let (storage, toc) = Storage::open(path, config)?;
        Ok(Self {
            storage,
            toc,
            entities: HashMap::new(),
        })
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Create a table with the given attributes
    pub fn create_table(&mut self, name: &str, attributes: Vec<Attribute>) -> Result<()> {
        if name.is_empty() {
            return Err(CairnError::InvalidArguments(
                "table name cannot be empty".to_string(),
            ));
        }
        if self.toc.contains(name) {
            return Err(CairnError::TableExists(name.to_string()));
        }

        let mut entity = Entity::new(0, attributes)?;
        let block_number = self.storage.find_free_block_number()?;
        entity.set_block_number(block_number);

        // Encode both records first; an oversized schema or name fails here
        let entity_block = Block::encode(&entity)?;
        let mut toc = self.toc.clone();
        toc.add(name, block_number)?;
        let toc_block = Block::encode(&toc)?;

        self.storage.write_block(&entity_block, block_number)?;
        self.storage.write_block(&toc_block, TOC_BLOCK)?;
        toc.mark_clean();
        entity.mark_clean();

        self.toc = toc;
        self.entities.insert(name.to_string(), entity);

        info!(table = name, block = block_number, "created table");
        Ok(())
    }

    /// Drop a table, releasing its Entity block and every row block
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if !self.toc.contains(name) {
            return Err(CairnError::UnknownTable(name.to_string()));
        }
        self.load_entity(name)?;

        let block_number = self.toc.remove(name)?;
        self.save_toc()?;

        let entity = self.entities.remove(name).ok_or_else(|| {
            CairnError::Invariant(format!("entity '{}' missing from cache", name))
        })?;
        for &row in entity.row_positions() {
            self.storage.release_block(row)?;
        }
        self.storage.release_block(block_number)?;

        info!(
            table = name,
            block = block_number,
            rows = entity.row_count(),
            "dropped table"
        );
        Ok(())
    }

    /// Drop several tables.
    ///
    /// All names are checked before any table is dropped.
    pub fn drop_tables<S: AsRef<str>>(&mut self, names: &[S]) -> Result<usize> {
        let mut seen = HashSet::new();
        for name in names {
            let name = name.as_ref();
            if !self.toc.contains(name) {
                return Err(CairnError::UnknownTable(name.to_string()));
            }
            if !seen.insert(name) {
                return Err(CairnError::InvalidArguments(format!(
                    "table '{}' listed more than once",
                    name
                )));
            }
        }

        for name in names {
            self.drop_table(name.as_ref())?;
        }
        Ok(names.len())
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.toc.contains(name)
    }

    /// Table names in sorted order
    pub fn table_names(&self) -> Vec<String> {
        self.toc.table_names().map(str::to_string).collect()
    }

    /// Attributes of a table in declaration order
    pub fn describe_table(&mut self, name: &str) -> Result<Vec<Attribute>> {
        Ok(self.entity(name)?.attributes().to_vec())
    }

    pub fn row_count(&mut self, name: &str) -> Result<usize> {
        Ok(self.entity(name)?.row_count())
    }

    /// Cached Entity of a table, loading it on first use
    pub fn entity(&mut self, name: &str) -> Result<&Entity> {
        self.load_entity(name)?;
        cached(&self.entities, name)
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Insert rows into a table.
    ///
    /// `field_names` of `None` means every attribute in declaration order.
    /// Every row is validated and encoded before the first block is
    /// written, and the grown Entity is checked to still fit in its block,
    /// so a rejected batch leaves the table untouched.
    pub fn insert_into_table(
        &mut self,
        name: &str,
        field_names: Option<&[String]>,
        rows: &[Vec<String>],
    ) -> Result<usize> {
        self.load_entity(name)?;

        let mut working = cached(&self.entities, name)?.clone();
        let fields = match field_names {
            Some(fields) => fields.to_vec(),
            None => working.attribute_names(),
        };

        let mut blocks = Vec::with_capacity(rows.len());
        for values in rows {
            let row = working.generate_new_row(fields.as_slice(), values.as_slice())?;
            blocks.push(Block::encode(&row).map_err(|e| match e {
                CairnError::BufferOverrun { .. } => CairnError::RowTooLarge(name.to_string()),
                other => other,
            })?);
        }

        // The Entity grows by one position per row and must still fit
        if !working.has_room_for(blocks.len())? {
            return Err(CairnError::TableFull {
                table: name.to_string(),
                additional: blocks.len(),
            });
        }

        // Counter bumps are committed together with the rows
        self.entities.insert(name.to_string(), working);

        for block in &blocks {
            let block_number = self.storage.find_free_block_number()?;
            self.storage.write_block(block, block_number)?;
            cached_mut(&mut self.entities, name)?.add_row_position(block_number)?;
        }

        debug!(table = name, rows = blocks.len(), "inserted rows");
        Ok(blocks.len())
    }

    /// Scan a table
    pub fn select_from_table(&mut self, name: &str, query: &SelectQuery) -> Result<RowCollection> {
        self.load_entity(name)?;
        let entity = cached(&self.entities, name)?;

        let fields = match &query.fields {
            Some(fields) => {
                for field in fields {
                    entity.require_attribute(field)?;
                }
                fields.clone()
            }
            None => entity.attribute_names(),
        };
        for key in &query.order_by {
            entity.require_attribute(&key.field)?;
        }
        let filter = query.filter.as_ref().map(|f| f.resolve(entity)).transpose()?;

        // Without ordering the scan can stop as soon as the limit is reached
        let early_limit = if query.order_by.is_empty() {
            query.limit
        } else {
            None
        };

        let mut rows = Vec::new();
        self.storage
            .visit_blocks(entity.row_positions(), |n, block| {
                let row = decode_row(n, block)?;
                if filter.as_ref().map_or(Ok(true), |f| f.matches(&row))? {
                    rows.push(row);
                }
                if early_limit.is_some_and(|limit| rows.len() >= limit) {
                    return Ok(Visit::Stop);
                }
                Ok(Visit::Continue)
            })?;

        if !query.order_by.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &query.order_by));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        debug!(table = name, rows = rows.len(), "selected rows");
        Ok(RowCollection { fields, rows })
    }

    /// Set fields of every matching row; returns the number of rows changed
    pub fn update_table(
        &mut self,
        name: &str,
        assignments: &[(String, String)],
        filter: Option<&Filter>,
    ) -> Result<usize> {
        self.load_entity(name)?;
        let entity = cached(&self.entities, name)?;

        if assignments.is_empty() {
            return Err(CairnError::InvalidArguments(
                "update needs at least one assignment".to_string(),
            ));
        }

        let mut values = Vec::with_capacity(assignments.len());
        let mut seen = HashSet::new();
        for (field, text) in assignments {
            let attribute = entity.require_attribute(field)?;
            if !seen.insert(field.as_str()) {
                return Err(CairnError::InvalidArguments(format!(
                    "field '{}' assigned more than once",
                    field
                )));
            }
            values.push((field.as_str(), attribute.parse_value(text)?));
        }
        let filter = filter.map(|f| f.resolve(entity)).transpose()?;

        let mut updated = Vec::new();
        self.storage
            .visit_blocks(entity.row_positions(), |n, block| {
                let mut row = decode_row(n, block)?;
                if filter.as_ref().map_or(Ok(true), |f| f.matches(&row))? {
                    for (field, value) in &values {
                        row.update_field(field, value.clone())?;
                    }
                    updated.push((n, Block::encode(&row)?));
                }
                Ok(Visit::Continue)
            })?;

        for (n, block) in &updated {
            self.storage.write_block(block, *n)?;
        }

        debug!(table = name, rows = updated.len(), "updated rows");
        Ok(updated.len())
    }

    /// Delete every matching row; returns the number of rows removed
    pub fn delete_from_table(&mut self, name: &str, filter: Option<&Filter>) -> Result<usize> {
        self.load_entity(name)?;
        let entity = cached(&self.entities, name)?;
        let filter = filter.map(|f| f.resolve(entity)).transpose()?;

        let mut doomed: Vec<BlockNumber> = Vec::new();
        self.storage
            .visit_blocks(entity.row_positions(), |n, block| {
                let row = decode_row(n, block)?;
                if filter.as_ref().map_or(Ok(true), |f| f.matches(&row))? {
                    doomed.push(n);
                }
                Ok(Visit::Continue)
            })?;

        for &n in &doomed {
            cached_mut(&mut self.entities, name)?.drop_row_position(n)?;
            self.storage.release_block(n)?;
        }

        debug!(table = name, rows = doomed.len(), "deleted rows");
        Ok(doomed.len())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Write the TOC and every dirty Entity.
    ///
    /// Clean records are skipped, so flushing twice writes nothing the
    /// second time.
    pub fn flush(&mut self) -> Result<()> {
        if self.toc.is_dirty() {
            self.save_toc()?;
        }

        let mut flushed = 0;
        for entity in self.entities.values_mut() {
            if entity.is_dirty() {
                self.storage.save_mono_storable(&*entity)?;
                entity.mark_clean();
                flushed += 1;
            }
        }

        if flushed > 0 {
            debug!(entities = flushed, "flushed entities");
        }
        Ok(())
    }

    /// Flush and close the file, reporting any error
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        self.storage.sync()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn toc(&self) -> &Toc {
        &self.toc
    }

    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.storage.cache_stats()
    }

    /// Whether a table's Entity is currently held in memory
    pub fn is_cached(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Make sure the Entity of `name` is in the cache
    fn load_entity(&mut self, name: &str) -> Result<()> {
        if self.entities.contains_key(name) {
            return Ok(());
        }
        if !self.toc.contains(name) {
            return Err(CairnError::UnknownTable(name.to_string()));
        }

        let block_number = self.toc.block_number_of(name)?;
        let entity: Entity = self.storage.decode_mono_storable(block_number)?;
        debug!(table = name, block = block_number, "loaded entity");
        self.entities.insert(name.to_string(), entity);
        Ok(())
    }

    fn save_toc(&mut self) -> Result<()> {
        self.storage.save_mono_storable(&self.toc)?;
        self.toc.mark_clean();
        Ok(())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(path = %self.storage.path().display(), error = %e, "flush on drop failed");
        }
    }
}

fn cached<'a>(entities: &'a HashMap<String, Entity>, name: &str) -> Result<&'a Entity> {
    entities
        .get(name)
        .ok_or_else(|| CairnError::Invariant(format!("entity '{}' missing from cache", name)))
}

fn cached_mut<'a>(entities: &'a mut HashMap<String, Entity>, name: &str) -> Result<&'a mut Entity> {
    entities
        .get_mut(name)
        .ok_or_else(|| CairnError::Invariant(format!("entity '{}' missing from cache", name)))
}

fn decode_row(n: BlockNumber, block: &Block) -> Result<Row> {
    let mut row: Row = block.decode()?;
    row.set_block_number(n);
    Ok(row)
}
