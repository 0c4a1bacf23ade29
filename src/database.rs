//! # Database
//!
//! A [`Database`] is a directory-scoped registry of named [`Table`]s: each
//! immediate subdirectory of the database root is one table, and the
//! subdirectory name is the table name. The registry itself holds no state
//! beyond the map — all persistence lives in the table directories.
//!
//! [`Database::create`] starts from scratch, wiping anything already at the
//! root; [`Database::open`] scans an existing root and opens every table in
//! it. Operations on a missing name fail with [`Error::TableNotFound`].
//!
//! ## Thread Safety
//!
//! The table map sits behind a reader-writer lock. Creating and dropping
//! tables take the write lock; row, metadata and checkpoint operations take
//! the read lock and lean on the per-table locking below them.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use parking_lot::RwLock;

use crate::error::Error;
use crate::geo::{Location, LocationIndexer};
use crate::table::{ResultSet, Table};
use crate::types::{Column, Value};

/// A named collection of tables rooted at one filesystem directory.
pub struct Database {
    root: PathBuf,
    tables: RwLock<HashMap<String, Table>>,
}

impl Database {
    /// Creates an empty database at `root`, deleting whatever was there.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.exists() {
            fs::remove_dir_all(&root)
                .wrap_err_with(|| format!("failed to clear {}", root.display()))?;
        }
        fs::create_dir_all(&root)
            .wrap_err_with(|| format!("failed to create {}", root.display()))?;
        Ok(Self {
            root,
            tables: RwLock::new(HashMap::new()),
        })
    }

    /// Opens the database at `root`, loading every table subdirectory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let mut tables = HashMap::new();
        let entries =
            fs::read_dir(&root).wrap_err_with(|| format!("failed to scan {}", root.display()))?;
        for entry in entries {
            let entry = entry.wrap_err_with(|| format!("failed to scan {}", root.display()))?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                let name = entry.file_name().to_string_lossy().to_string();
                let table = Table::open(entry.path())
                    .wrap_err_with(|| format!("failed to open table '{}'", name))?;
                tables.insert(name, table);
            }
        }
        Ok(Self {
            root,
            tables: RwLock::new(tables),
        })
    }

    /// The database root directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates a table named `name` under the database root.
    pub fn create_table(
        &self,
        name: &str,
        indexer: impl LocationIndexer + 'static,
        columns: Vec<Column>,
    ) -> Result<()> {
        let table = Table::create(self.root.join(name), indexer, columns)?;
        self.tables.write().insert(name.to_string(), table);
        Ok(())
    }

    /// Removes the table from the registry and deletes its directory.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        let table = self
            .tables
            .write()
            .remove(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
        table.destroy()
    }

    /// The names of every registered table, in no particular order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// The schema of the named table.
    pub fn columns(&self, table: &str) -> Result<Vec<Column>> {
        let tables = self.tables.read();
        let table = Self::lookup(&tables, table)?;
        Ok(table.columns().to_vec())
    }

    /// Reads projected columns at each location of the named table.
    pub fn get_rows(
        &self,
        table: &str,
        columns: &[&str],
        locations: &[Location],
    ) -> Result<ResultSet> {
        let tables = self.tables.read();
        Self::lookup(&tables, table)?.get_rows(columns, locations)
    }

    /// Writes values into projected columns at each location of the named
    /// table, returning how many rows were fully written.
    pub fn set_rows(
        &self,
        table: &str,
        columns: &[&str],
        locations: &[Location],
        values: &[Vec<Value>],
    ) -> Result<usize> {
        let tables = self.tables.read();
        Ok(Self::lookup(&tables, table)?.set_rows(columns, locations, values)?)
    }

    /// The metadata value stored under `key` in the named table, or empty.
    pub fn get_metadata(&self, table: &str, key: &str) -> Result<String> {
        let tables = self.tables.read();
        Ok(Self::lookup(&tables, table)?
            .metadata(key)
            .unwrap_or_default())
    }

    /// Inserts or replaces a metadata entry in the named table.
    pub fn set_metadata(&self, table: &str, key: &str, value: &str) -> Result<()> {
        let tables = self.tables.read();
        Self::lookup(&tables, table)?.set_metadata(key, value)
    }

    /// Flushes every table's dirty pages to disk.
    pub fn checkpoint(&self) -> Result<()> {
        let tables = self.tables.read();
        for table in tables.values() {
            table.checkpoint()?;
        }
        Ok(())
    }

    fn lookup<'a>(tables: &'a HashMap<String, Table>, name: &str) -> Result<&'a Table> {
        tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()).into())
    }
}
