//! # Tables
//!
//! A [`Table`] pairs a [`Store`] with a [`LocationIndexer`] and persists the
//! pairing, so rows are addressed by [`Location`] instead of raw index. The
//! indexer's cell count fixes the store's row count at creation.
//!
//! ## On-Disk Layout
//!
//! ```text
//! <table-dir>/
//! ├── <name>.tbl.json    # {"indexer": {...}, "indexerName": "...", "metadata": {...}}
//! ├── <name>.meta.json   # store schema
//! └── <name>.dat         # data pages
//! ```
//!
//! The directory name *is* the table name; renaming the directory renames
//! the table, and nothing inside the JSON files repeats it. Opening a table
//! reads `indexerName` first and then deserializes the indexer parameters
//! under the matching concrete type; unknown names fail with
//! [`Error::UnknownIndexerScheme`].
//!
//! ## Metadata
//!
//! Tables carry a free-form string map. Two keys are stamped at creation:
//! `projection` (the indexer's name tag) and `created-at` (an RFC-3339 UTC
//! timestamp). [`Table::set_metadata`] rewrites the `.tbl.json` sidecar.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use eyre::{ensure, Result, WrapErr};
use parking_lot::RwLock;
use serde_json::json;

use crate::error::{Error, SetRowsError};
use crate::geo::{indexer_from_json, Location, LocationIndexer};
use crate::storage::Store;
use crate::types::{Column, Projection, Value};

/// Extension of the table sidecar inside a table directory.
pub const TABLE_FILE_EXT: &str = ".tbl.json";

/// Metadata key holding the indexer's name tag.
pub const PROJECTION_KEY: &str = "projection";
/// Metadata key holding the creation timestamp.
pub const CREATED_AT_KEY: &str = "created-at";

/// The outcome of a multi-location read: the projected columns and one
/// value-list per requested location, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

/// A pixel-addressed table: a fixed-schema store whose rows are looked up
/// through a location indexer.
#[derive(Debug)]
pub struct Table {
    store: Store,
    indexer: Box<dyn LocationIndexer>,
    indexer_name: String,
    metadata: RwLock<HashMap<String, String>>,
}

impl Table {
    /// Creates a new table at `path`, sized to the indexer's cell count and
    /// filled with the columns' defaults.
    pub fn create(
        path: impl AsRef<Path>,
        indexer: impl LocationIndexer + 'static,
        columns: Vec<Column>,
    ) -> Result<Self> {
        let store = Store::create(path, indexer.size(), columns)?;

        let mut metadata = HashMap::new();
        metadata.insert(PROJECTION_KEY.to_string(), indexer.name().to_string());
        metadata.insert(CREATED_AT_KEY.to_string(), rfc3339_utc_now());

        let table = Self {
            store,
            indexer_name: indexer.name().to_string(),
            indexer: Box::new(indexer),
            metadata: RwLock::new(metadata),
        };
        table.save_metadata()?;
        Ok(table)
    }

    /// Opens an existing table, dispatching on the persisted indexer name to
    /// rebuild the concrete indexer.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Store::open(path)?;

        let meta_path = store
            .path()
            .join(format!("{}{}", store.name(), TABLE_FILE_EXT));
        let text = fs::read(&meta_path)
            .wrap_err_with(|| format!("failed to read {}", meta_path.display()))?;
        let doc: serde_json::Value = serde_json::from_slice(&text)
            .wrap_err_with(|| format!("failed to decode {}", meta_path.display()))?;

        let indexer_name = doc["indexerName"]
            .as_str()
            .ok_or_else(|| eyre::eyre!("table metadata {} lacks indexerName", meta_path.display()))?
            .to_string();
        let indexer = indexer_from_json(&indexer_name, &doc["indexer"])?;

        let metadata: HashMap<String, String> = serde_json::from_value(doc["metadata"].clone())
            .wrap_err_with(|| format!("failed to decode metadata map in {}", meta_path.display()))?;

        Ok(Self {
            store,
            indexer,
            indexer_name,
            metadata: RwLock::new(metadata),
        })
    }

    pub fn name(&self) -> &str {
        self.store.name()
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn columns(&self) -> &[Column] {
        self.store.columns()
    }

    pub fn indexer(&self) -> &dyn LocationIndexer {
        self.indexer.as_ref()
    }

    pub fn indexer_name(&self) -> &str {
        &self.indexer_name
    }

    /// The metadata value stored under `key`, if any.
    pub fn metadata(&self, key: &str) -> Option<String> {
        self.metadata.read().get(key).cloned()
    }

    /// A snapshot of the whole metadata map.
    pub fn metadata_snapshot(&self) -> HashMap<String, String> {
        self.metadata.read().clone()
    }

    /// Inserts or replaces a metadata entry and rewrites the sidecar.
    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.metadata
            .write()
            .insert(key.to_string(), value.to_string());
        self.save_metadata()
    }

    /// Reads the projected columns for every location, in request order.
    pub fn get_rows(&self, columns: &[&str], locations: &[Location]) -> Result<ResultSet> {
        let projection = self.store.projection(columns)?;
        let mut rows = Vec::with_capacity(locations.len());
        for &location in locations {
            let index = self.indexer.to_index(location)?;
            let raw = self.store.get_row_at(index)?;
            rows.push(raw.project(&projection));
        }
        Ok(ResultSet {
            columns: self.store.filter_columns(&projection),
            rows,
        })
    }

    /// Writes `values[i]` into the projected columns of `locations[i]` for
    /// every i, via read-modify-write of each whole row.
    ///
    /// On failure the error reports how many rows were fully written before
    /// the failing index; those writes stay applied.
    pub fn set_rows(
        &self,
        columns: &[&str],
        locations: &[Location],
        values: &[Vec<Value>],
    ) -> std::result::Result<usize, SetRowsError> {
        let attempted = locations.len();
        let partial = |written: usize, source: eyre::Report| SetRowsError {
            written,
            attempted,
            source: source.into(),
        };

        let projection = self
            .store
            .projection(columns)
            .map_err(|e| partial(0, e))?;
        if values.len() != locations.len() {
            return Err(partial(
                0,
                eyre::eyre!(
                    "{} locations but {} value rows",
                    locations.len(),
                    values.len()
                ),
            ));
        }

        for (i, &location) in locations.iter().enumerate() {
            self.write_row(&projection, location, &values[i])
                .map_err(|e| partial(i, e))?;
        }
        Ok(attempted)
    }

    /// Single-cell convenience for writing one column at one location.
    pub fn set_value(&self, column: &str, location: Location, value: &Value) -> Result<()> {
        let index = self.indexer.to_index(location)?;
        self.store.set_value_at(column, index, value)
    }

    /// Flushes every dirty cached page to disk.
    pub fn checkpoint(&self) -> Result<()> {
        self.store.checkpoint()
    }

    /// Purges the cache and deletes the table directory.
    pub fn destroy(&self) -> Result<()> {
        self.store.destroy()
    }

    fn write_row(&self, projection: &Projection, location: Location, values: &[Value]) -> Result<()> {
        ensure!(
            values.len() == projection.len(),
            "row carries {} values for {} projected columns",
            values.len(),
            projection.len()
        );

        let index = self.indexer.to_index(location)?;
        let mut row = self.store.get_row_at(index)?;
        for (span, value) in projection.iter().zip(values) {
            if value.len() != span.size() {
                return Err(Error::ValueSizeMismatch {
                    expected: span.size(),
                    actual: value.len(),
                }
                .into());
            }
            row.as_bytes_mut()[span.start()..span.start() + span.size()]
                .copy_from_slice(value.as_bytes());
        }
        self.store.set_row_at(index, &row)
    }

    fn save_metadata(&self) -> Result<()> {
        let doc = json!({
            "indexer": self.indexer.to_json()?,
            "indexerName": self.indexer_name,
            "metadata": &*self.metadata.read(),
        });
        let path = self
            .store
            .path()
            .join(format!("{}{}", self.store.name(), TABLE_FILE_EXT));
        fs::write(&path, serde_json::to_vec(&doc)?)
            .wrap_err_with(|| format!("failed to write {}", path.display()))
    }
}

/// The current time as an RFC-3339 UTC timestamp with second precision.
fn rfc3339_utc_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    format_rfc3339_utc(secs)
}

fn format_rfc3339_utc(secs: i64) -> String {
    let days = secs.div_euclid(86_400);
    let rem = secs.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        rem / 3600,
        (rem / 60) % 60,
        rem % 60
    )
}

/// Proleptic Gregorian date from days since the Unix epoch.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month as u32, day as u32)
}
