//! Database Manager
//!
//! Maps database names to files and tracks the database in use.
//!
//! ## Responsibilities
//! - `name` ↔ `{storage_dir}/{name}.{file_extension}`
//! - Discover existing databases by file extension
//! - Create/drop database files
//! - Keep at most one database open ("in use") at a time

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::database::Database;
use crate::error::{CairnError, Result};

struct ActiveDatabase {
    name: String,
    database: Database,
}

/// Directory of database files
pub struct DatabaseManager {
    config: Config,
    active: Option<ActiveDatabase>,
}

impl DatabaseManager {
    /// Create a manager, creating the storage directory if needed
    pub fn new(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.storage_dir)?;
        Ok(Self {
            config,
            active: None,
        })
    }

    /// File path of a database
    pub fn database_path(&self, name: &str) -> Result<PathBuf> {
        Self::validate_name(name)?;
        Ok(self
            .config
            .storage_dir
            .join(format!("{}.{}", name, self.config.file_extension)))
    }

    pub fn database_exists(&self, name: &str) -> bool {
        self.database_path(name)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Create an empty database file; does not make it active
    pub fn create_database(&mut self, name: &str) -> Result<()> {
        let path = self.database_path(name)?;
        if path.exists() {
            return Err(CairnError::DatabaseExists(name.to_string()));
        }

        Database::create(&path, &self.config)?.close()?;
        info!(database = name, "created database");
        Ok(())
    }

    /// Delete a database file, closing it first if it is in use
    pub fn drop_database(&mut self, name: &str) -> Result<()> {
        let path = self.database_path(name)?;
        if !path.is_file() {
            return Err(CairnError::UnknownDatabase(name.to_string()));
        }

        if self.active_name() == Some(name) {
            self.close_active()?;
        }

        fs::remove_file(&path)?;
        info!(database = name, "dropped database");
        Ok(())
    }

    /// Open a database and make it the active one.
    ///
    /// The previously active database is flushed and closed.
    pub fn use_database(&mut self, name: &str) -> Result<()> {
        let path = self.database_path(name)?;
        if !path.is_file() {
            return Err(CairnError::UnknownDatabase(name.to_string()));
        }
        if self.active_name() == Some(name) {
            return Ok(());
        }

        self.close_active()?;
        let database = Database::open(&path, &self.config)?;
        self.active = Some(ActiveDatabase {
            name: name.to_string(),
            database,
        });

        info!(database = name, "using database");
        Ok(())
    }

    /// Names of all databases in the storage directory, sorted
    pub fn list_database_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.config.storage_dir)? {
            let path = entry?.path();
            if path.is_file() {
                if let Some(name) = self.parse_database_name(&path) {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// The database in use
    pub fn active(&mut self) -> Result<&mut Database> {
        self.active
            .as_mut()
            .map(|active| &mut active.database)
            .ok_or(CairnError::NoActiveDatabase)
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.name.as_str())
    }

    /// Flush and close the active database, if any
    pub fn close_active(&mut self) -> Result<()> {
        if let Some(active) = self.active.take() {
            debug!(database = %active.name, "closing database");
            active.database.close()?;
        }
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// ASCII letters, digits and '_' only, so a name can never escape the
    /// storage directory
    fn validate_name(name: &str) -> Result<()> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(CairnError::InvalidDatabaseName(name.to_string()))
        }
    }

    /// "shop.cdb" → Some("shop")
    fn parse_database_name(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?;
        if ext != self.config.file_extension {
            return None;
        }
        let name = path.file_stem()?.to_str()?;
        Self::validate_name(name).ok()?;
        Some(name.to_string())
    }
}
