//! # Column and Value Types
//!
//! The atomic type system for PixiDB stores. Every cell in a table holds one
//! of ten fixed-width numeric kinds, encoded big-endian on disk. There are no
//! variable-length columns and no nulls; a column's default value fills every
//! row when the table is created.
//!
//! - [`ColumnType`]: the closed set of storable kinds and their byte sizes
//! - [`Column`]: name + kind + encoded default
//! - [`Value`]: a length-tagged byte buffer with typed accessors
//! - [`Row`]: one record's raw bytes, sliceable through a [`Projection`]

mod column;
mod value;

pub use column::{Column, ColumnType};
pub use value::{ColumnSpan, Projection, Row, Value};
