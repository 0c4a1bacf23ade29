//! # Schema-Bound Row Store
//!
//! A [`Store`] binds an ordered list of columns to a [`Pagemaster`] and
//! addresses rows by a dense integer index. Row size, rows-per-page and the
//! per-column byte spans are all derived from the schema once and never
//! change: there is no schema evolution.
//!
//! ## Row Addressing
//!
//! For row index `i`:
//!
//! ```text
//! page   = i / rows_per_page
//! offset = (i % rows_per_page) * row_size
//! ```
//!
//! Rows never straddle a page boundary; the tail of each payload is unused
//! padding left over from the default-row fill.
//!
//! ## Creation
//!
//! `Store::create` lays down the directory, writes the schema sidecar
//! (`<name>.meta.json`), and initializes the data file with every row set to
//! the schema's default values. One extra page is allocated beyond the exact
//! quotient so the final partial page is always backed, even when the row
//! count divides evenly.
//!
//! `Store::open` only reads the sidecar; the data file is not touched until
//! the first row access.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{Pagemaster, DATA_FILE_EXT, MAX_PAGES_IN_CACHE, META_FILE_EXT};
use crate::error::Error;
use crate::types::{Column, ColumnSpan, Projection, Row, Value};

/// Serialized form of the schema sidecar.
#[derive(Serialize, Deserialize)]
struct StoreMeta {
    columns: Vec<Column>,
    rows: i64,
}

/// A fixed-schema set of rows backed by one checksummed page file.
#[derive(Debug)]
pub struct Store {
    name: String,
    columns: Vec<Column>,
    rows: i64,
    path: PathBuf,
    file: Pagemaster,
    column_map: HashMap<String, ColumnSpan>,
    row_size: usize,
    rows_per_page: usize,
}

impl Store {
    /// Creates a new store at `path` (the final path component becomes the
    /// store's name) with `rows` rows, every one filled from the columns'
    /// defaults.
    pub fn create(path: impl AsRef<Path>, rows: i64, columns: Vec<Column>) -> Result<Self> {
        let path = path.as_ref();
        if columns.is_empty() {
            return Err(Error::ZeroColumns.into());
        }

        fs::create_dir_all(path)
            .wrap_err_with(|| format!("failed to create store directory {}", path.display()))?;
        let name = store_name(path)?;

        let file = Pagemaster::new(
            path.join(format!("{}{}", name, DATA_FILE_EXT)),
            MAX_PAGES_IN_CACHE,
        );

        let row_size: usize = columns.iter().map(|c| c.size()).sum();
        if row_size > file.page_payload() {
            return Err(Error::RowTooLarge {
                row_size,
                page_payload: file.page_payload(),
            }
            .into());
        }
        let rows_per_page = file.page_payload() / row_size;
        // One page beyond the quotient, so the trailing partial page (or the
        // first page past an exact multiple) is always default-filled.
        let pages = (rows as usize / rows_per_page) + 1;

        let meta = StoreMeta {
            columns: columns.clone(),
            rows,
        };
        let meta_path = path.join(format!("{}{}", name, META_FILE_EXT));
        let json = serde_json::to_vec(&meta).wrap_err("failed to encode store metadata")?;
        fs::write(&meta_path, json)
            .wrap_err_with(|| format!("failed to write {}", meta_path.display()))?;

        let mut default_row = Vec::with_capacity(row_size);
        for column in &columns {
            default_row.extend_from_slice(column.default().as_bytes());
        }
        let mut default_page = Vec::with_capacity(row_size * rows_per_page);
        for _ in 0..rows_per_page {
            default_page.extend_from_slice(&default_row);
        }
        file.initialize(pages, &default_page)?;

        Ok(Self {
            name,
            column_map: column_spans(&columns),
            columns,
            rows,
            path: path.to_path_buf(),
            file,
            row_size,
            rows_per_page,
        })
    }

    /// Opens an existing store by reading its schema sidecar. The data file
    /// is not accessed until a row is read or written.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = store_name(path)?;

        let meta_path = path.join(format!("{}{}", name, META_FILE_EXT));
        let json = fs::read(&meta_path)
            .wrap_err_with(|| format!("failed to read {}", meta_path.display()))?;
        let meta: StoreMeta = serde_json::from_slice(&json)
            .wrap_err_with(|| format!("failed to decode {}", meta_path.display()))?;

        let file = Pagemaster::new(
            path.join(format!("{}{}", name, DATA_FILE_EXT)),
            MAX_PAGES_IN_CACHE,
        );

        if meta.columns.is_empty() {
            return Err(Error::ZeroColumns.into());
        }
        let row_size: usize = meta.columns.iter().map(|c| c.size()).sum();
        if row_size > file.page_payload() {
            return Err(Error::RowTooLarge {
                row_size,
                page_payload: file.page_payload(),
            }
            .into());
        }
        let rows_per_page = file.page_payload() / row_size;

        Ok(Self {
            name,
            column_map: column_spans(&meta.columns),
            columns: meta.columns,
            rows: meta.rows,
            path: path.to_path_buf(),
            file,
            row_size,
            rows_per_page,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The number of addressable rows.
    pub fn rows(&self) -> i64 {
        self.rows
    }

    /// The on-disk width of one row in bytes.
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// The number of whole rows packed into each page payload.
    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    /// Every column's default value concatenated in schema order.
    pub fn default_row(&self) -> Vec<u8> {
        let mut row = Vec::with_capacity(self.row_size);
        for column in &self.columns {
            row.extend_from_slice(column.default().as_bytes());
        }
        row
    }

    /// Resolves requested column names into byte spans, in request order.
    /// Unknown names fail with [`Error::ColumnNotFound`].
    pub fn projection(&self, columns: &[&str]) -> Result<Projection> {
        let mut spans = SmallVec::new();
        for &column in columns {
            match self.column_map.get(column) {
                Some(span) => spans.push(*span),
                None => {
                    return Err(Error::ColumnNotFound {
                        store: self.name.clone(),
                        column: column.to_string(),
                    }
                    .into())
                }
            }
        }
        Ok(Projection::from_spans(spans))
    }

    /// The schema columns selected by a projection, in projection order.
    pub fn filter_columns(&self, projection: &Projection) -> Vec<Column> {
        projection
            .iter()
            .map(|span| self.columns[span.index].clone())
            .collect()
    }

    /// Reads the raw bytes of the row at `index`.
    pub fn get_row_at(&self, index: i64) -> Result<Row> {
        let (page, offset) = self.row_coordinates(index)?;
        let bytes = self.file.get_chunk(page, offset, self.row_size)?;
        Ok(Row::from_bytes(bytes))
    }

    /// Single-column shortcut for reading a whole row as one value. Only
    /// valid on single-column stores, where the row and the value coincide.
    pub fn get_value_at(&self, index: i64) -> Result<Value> {
        eyre::ensure!(
            self.columns.len() == 1,
            "get_value_at requires a single-column store, '{}' has {} columns",
            self.name,
            self.columns.len()
        );
        let (page, offset) = self.row_coordinates(index)?;
        let bytes = self.file.get_chunk(page, offset, self.row_size)?;
        Ok(Value::from_encoded(bytes))
    }

    /// Overwrites the row at `index` with `row`, which must be exactly one
    /// row wide.
    pub fn set_row_at(&self, index: i64, row: &Row) -> Result<()> {
        if row.len() != self.row_size {
            return Err(Error::ValueSizeMismatch {
                expected: self.row_size,
                actual: row.len(),
            }
            .into());
        }
        let (page, offset) = self.row_coordinates(index)?;
        self.file.set_chunk(page, offset, row.as_bytes())
    }

    /// Overwrites a single column's bytes within the row at `index`.
    pub fn set_value_at(&self, column: &str, index: i64, value: &Value) -> Result<()> {
        let span = match self.column_map.get(column) {
            Some(span) => *span,
            None => {
                return Err(Error::ColumnNotFound {
                    store: self.name.clone(),
                    column: column.to_string(),
                }
                .into())
            }
        };
        if value.len() != span.size() {
            return Err(Error::ValueSizeMismatch {
                expected: span.size(),
                actual: value.len(),
            }
            .into());
        }
        let (page, offset) = self.row_coordinates(index)?;
        self.file.set_chunk(page, offset + span.start(), value.as_bytes())
    }

    /// Flushes every dirty cached page to disk.
    pub fn checkpoint(&self) -> Result<()> {
        self.file.flush_all_pages()
    }

    /// Purges the cache and deletes the store directory with everything in
    /// it.
    pub fn destroy(&self) -> Result<()> {
        self.file.clear_cache();
        fs::remove_dir_all(&self.path)
            .wrap_err_with(|| format!("failed to remove store directory {}", self.path.display()))
    }

    fn row_coordinates(&self, index: i64) -> Result<(usize, usize)> {
        eyre::ensure!(
            index >= 0 && index < self.rows,
            "row index {} out of range for store '{}' with {} rows",
            index,
            self.name,
            self.rows
        );
        let page = (index / self.rows_per_page as i64) as usize;
        let offset = (index % self.rows_per_page as i64) as usize * self.row_size;
        Ok((page, offset))
    }
}

/// Derives the store name from the final component of its directory path.
fn store_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| eyre::eyre!("store path {} has no directory name", path.display()))
}

/// Maps each column name to its position and byte span within a row.
/// A duplicated name keeps the last span, but every column still occupies
/// its ordered position on disk.
fn column_spans(columns: &[Column]) -> HashMap<String, ColumnSpan> {
    let mut map = HashMap::with_capacity(columns.len());
    let mut offset = 0;
    for (index, column) in columns.iter().enumerate() {
        map.insert(
            column.name().to_string(),
            ColumnSpan {
                index,
                start: offset,
                size: column.size(),
            },
        );
        offset += column.size();
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{os_page_size, CHECKSUM_SIZE};
    use crate::types::ColumnType;
    use tempfile::tempdir;

    fn payload() -> usize {
        os_page_size() - CHECKSUM_SIZE
    }

    fn two_column_schema() -> Vec<Column> {
        vec![
            Column::from_encoded("one", ColumnType::Int16, Value::from_encoded(vec![0, 1]))
                .unwrap(),
            Column::from_encoded(
                "two",
                ColumnType::Int64,
                Value::from_encoded(vec![9, 8, 7, 1, 2, 3, 4, 5]),
            )
            .unwrap(),
        ]
    }

    #[test]
    fn create_derives_layout_from_schema() {
        let dir = tempdir().unwrap();
        let store = Store::create(dir.path().join("twocolumn"), 10, two_column_schema()).unwrap();

        assert_eq!(store.name(), "twocolumn");
        assert_eq!(store.rows(), 10);
        assert_eq!(store.row_size(), 10);
        assert_eq!(store.rows_per_page(), payload() / 10);
        assert_eq!(store.default_row(), vec![0, 1, 9, 8, 7, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn create_rejects_empty_schema() {
        let dir = tempdir().unwrap();
        let err = Store::create(dir.path().join("empty"), 5, vec![]).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::ZeroColumns)));
    }

    #[test]
    fn create_rejects_rows_wider_than_a_page() {
        let dir = tempdir().unwrap();
        let columns: Vec<Column> = (0..=payload() / 8)
            .map(|i| Column::int64(format!("col{}", i), 0))
            .collect();

        let err = Store::create(dir.path().join("wide"), 5, columns).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::RowTooLarge { .. })
        ));
    }

    #[test]
    fn new_store_is_default_filled() {
        let dir = tempdir().unwrap();
        let store = Store::create(dir.path().join("filled"), 1000, two_column_schema()).unwrap();
        let default = store.default_row();

        for index in [0, 500, 999] {
            assert_eq!(store.get_row_at(index).unwrap().as_bytes(), &default[..]);
        }
    }

    #[test]
    fn open_rebuilds_layout_without_touching_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen");
        Store::create(&path, 10, two_column_schema()).unwrap();

        let store = Store::open(&path).unwrap();
        assert_eq!(store.name(), "reopen");
        assert_eq!(store.rows(), 10);
        assert_eq!(store.row_size(), 10);
        assert_eq!(store.rows_per_page(), payload() / 10);
        assert_eq!(
            store.get_row_at(0).unwrap().as_bytes(),
            &store.default_row()[..]
        );
    }

    #[test]
    fn set_checkpoint_reopen_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("persist");
        let store = Store::create(&path, 10, two_column_schema()).unwrap();

        let row = Row::from_bytes(vec![7, 7, 4, 4, 5, 5, 6, 6, 7, 7]);
        store.set_row_at(0, &row).unwrap();
        store.set_row_at(9, &row).unwrap();
        store.checkpoint().unwrap();

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.get_row_at(0).unwrap(), row);
        assert_eq!(reopened.get_row_at(9).unwrap(), row);
        assert_eq!(
            reopened.get_row_at(5).unwrap().as_bytes(),
            &reopened.default_row()[..]
        );
    }

    #[test]
    fn projection_resolves_spans_in_request_order() {
        let dir = tempdir().unwrap();
        let store = Store::create(dir.path().join("proj"), 4, two_column_schema()).unwrap();

        let projection = store.projection(&["two", "one"]).unwrap();
        assert_eq!(projection.len(), 2);

        let row = store.get_row_at(0).unwrap();
        let values = row.project(&projection);
        assert_eq!(values[0].as_bytes(), &[9, 8, 7, 1, 2, 3, 4, 5]);
        assert_eq!(values[1].as_bytes(), &[0, 1]);

        let filtered = store.filter_columns(&projection);
        assert_eq!(filtered[0].name(), "two");
        assert_eq!(filtered[1].name(), "one");
    }

    #[test]
    fn projection_rejects_unknown_columns() {
        let dir = tempdir().unwrap();
        let store = Store::create(dir.path().join("missing"), 4, two_column_schema()).unwrap();

        let err = store.projection(&["nope"]).unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::ColumnNotFound { store, column }) => {
                assert_eq!(store, "missing");
                assert_eq!(column, "nope");
            }
            other => panic!("expected ColumnNotFound, got {:?}", other),
        }
    }

    #[test]
    fn set_value_at_touches_only_its_span() {
        let dir = tempdir().unwrap();
        let store = Store::create(dir.path().join("span"), 4, two_column_schema()).unwrap();

        store
            .set_value_at("two", 1, &Value::from_i64(-1))
            .unwrap();

        let row = store.get_row_at(1).unwrap();
        assert_eq!(&row.as_bytes()[..2], &[0, 1]);
        assert_eq!(&row.as_bytes()[2..], &[0xFF; 8]);
    }

    #[test]
    fn set_value_at_rejects_wrong_width() {
        let dir = tempdir().unwrap();
        let store = Store::create(dir.path().join("width"), 4, two_column_schema()).unwrap();

        let err = store
            .set_value_at("two", 0, &Value::from_i16(1))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::ValueSizeMismatch { expected: 8, actual: 2 })
        ));
    }

    #[test]
    fn get_value_at_requires_single_column() {
        let dir = tempdir().unwrap();
        let single = Store::create(
            dir.path().join("single"),
            4,
            vec![Column::int32("only", 6)],
        )
        .unwrap();
        assert_eq!(single.get_value_at(2).unwrap().as_i32(), 6);

        let multi = Store::create(dir.path().join("multi"), 4, two_column_schema()).unwrap();
        assert!(multi.get_value_at(0).is_err());
    }

    #[test]
    fn destroy_removes_the_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doomed");
        let store = Store::create(&path, 4, two_column_schema()).unwrap();

        store.destroy().unwrap();
        assert!(!path.exists());
    }
}
