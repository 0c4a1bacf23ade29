//! # PixiDB - Pixel-Indexed Storage Engine
//!
//! PixiDB is an embedded, single-writer, multi-reader storage engine for
//! fixed-schema tabular data whose rows are addressed by *pixel index* — an
//! integer derived from a geospatial location under a chosen spherical
//! projection. It targets read/update workloads over dense global raster
//! data (tiles, HEALPix sky maps, equirectangular or Mercator grids) where
//! the cell count is known up front, rows are fixed-width, and locality
//! comes from index contiguity.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pixidb::{Column, Database, Location, ProjectionlessIndexer, Value};
//!
//! let db = Database::create("./mydb")?;
//! db.create_table(
//!     "elevation",
//!     ProjectionlessIndexer::new(360, 180, true),
//!     vec![Column::int32("meters", 0)],
//! )?;
//!
//! db.set_rows(
//!     "elevation",
//!     &["meters"],
//!     &[Location::Grid { x: 12, y: 34 }],
//!     &[vec![Value::from_i32(8848)]],
//! )?;
//! db.checkpoint()?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Database (name → Table)          │
//! ├─────────────────────────────────────────┤
//! │   Table (LocationIndexer + metadata)    │
//! ├────────────────────┬────────────────────┤
//! │  Location Indexing │  Store (schema,    │
//! │  grid / mercator / │  row addressing,   │
//! │  equirect / healpix│  projections)      │
//! ├────────────────────┴────────────────────┤
//! │   Pagemaster (CRC-32 checked pages,     │
//! │   bounded cache, explicit flush)        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! A read runs Database → Table → indexer `to_index` → Store row address →
//! Pagemaster chunk → cache hit or CRC-verified disk read → row bytes →
//! projection slices → typed value accessors.
//!
//! ## File Layout
//!
//! ```text
//! database_dir/
//! ├── chlorophyll/            # one directory per table
//! │   ├── chlorophyll.tbl.json   # indexer choice + string metadata
//! │   ├── chlorophyll.meta.json  # columns + row count
//! │   └── chlorophyll.dat        # checksummed data pages
//! └── elevation/
//!     └── ...
//! ```
//!
//! ## Durability Model
//!
//! Writes land in the page cache and are immediately visible to other
//! threads in the process. They reach disk on `checkpoint()` (or when a
//! dirty page is evicted); a crash before a checkpoint loses the unflushed
//! writes. There is no WAL, no transaction layer, and no cross-process
//! coordination — a second process opening the same table is undefined
//! behavior.
//!
//! ## Module Overview
//!
//! - [`storage`]: checksummed page cache and the schema-bound row store
//! - [`geo`]: locations, map projections, HEALPix math, location indexers
//! - [`types`]: column kinds, big-endian values, rows, projections
//! - [`table`]: indexer + store pairing with persisted metadata
//! - [`database`]: directory registry of named tables
//! - [`error`]: the recoverable failure kinds

pub mod database;
pub mod error;
pub mod geo;
pub mod storage;
pub mod table;
pub mod types;

pub use database::Database;
pub use error::{Error, SetRowsError};
pub use geo::{
    CylindricalEquirectangularIndexer, FlatHealpixIndexer, HealpixScheme, Location,
    LocationIndexer, MercatorCutoffIndexer, ProjectionlessIndexer,
};
pub use storage::{Pagemaster, Store};
pub use table::{ResultSet, Table};
pub use types::{Column, ColumnType, Projection, Row, Value};
