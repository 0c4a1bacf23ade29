//! Error types for all PixiDB operations.
//!
//! Fallible APIs throughout the crate return [`eyre::Result`]; the variants
//! below are the recoverable failure kinds an embedder can pick back out of a
//! report with `downcast_ref::<Error>()`. Plain I/O failures stay as wrapped
//! `std::io::Error` values with path context attached.

use thiserror::Error;

use crate::geo::Location;

/// Recoverable failure kinds surfaced by the storage and indexing layers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot create a store with zero columns")]
    ZeroColumns,

    #[error("table '{0}' not found in database")]
    TableNotFound(String),

    #[error("column '{column}' not found in store '{store}'")]
    ColumnNotFound { store: String, column: String },

    #[error("location {location:?} not supported by indexer '{indexer}'")]
    LocationNotSupported {
        indexer: &'static str,
        location: Location,
    },

    #[error("location {location:?} outside the valid domain of the indexer")]
    LocationOutOfBounds { location: Location },

    #[error("checksum mismatch on page {page}")]
    CorruptedPage { page: usize },

    #[error("unknown table indexer scheme '{0}'")]
    UnknownIndexerScheme(String),

    #[error("value size {actual} does not match column size {expected}")]
    ValueSizeMismatch { expected: usize, actual: usize },

    #[error("row of {row_size} bytes does not fit a page payload of {page_payload} bytes")]
    RowTooLarge {
        row_size: usize,
        page_payload: usize,
    },
}

/// Partial-failure result of a multi-row write.
///
/// Rows before `written` were fully applied; the row at index `written`
/// failed with `source` and no later row was attempted.
#[derive(Debug, Error)]
#[error("stopped after writing {written} of {attempted} rows")]
pub struct SetRowsError {
    pub written: usize,
    pub attempted: usize,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}
