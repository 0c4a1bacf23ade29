//! # Column Types and Column Metadata
//!
//! [`ColumnType`] is the closed set of kinds a store can hold: signed and
//! unsigned integers of 8/16/32/64 bits plus 32/64-bit floats. The
//! discriminant doubles as the on-disk type tag in the store's sidecar
//! metadata, so the numbering is part of the file format and must not change:
//!
//! | Tag | Kind    | Size |
//! |-----|---------|------|
//! | 0   | Int8    | 1    |
//! | 1   | Uint8   | 1    |
//! | 2   | Int16   | 2    |
//! | 3   | Uint16  | 2    |
//! | 4   | Int32   | 4    |
//! | 5   | Uint32  | 4    |
//! | 6   | Int64   | 8    |
//! | 7   | Uint64  | 8    |
//! | 8   | Float32 | 4    |
//! | 9   | Float64 | 8    |
//!
//! A [`Column`] pairs a name with a kind and a default value that fills the
//! column's slot in every row at table creation. The default is stored
//! already encoded; its length must equal the kind's size.

use eyre::Result;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::Value;

/// The atomic kinds of values a store can hold.
///
/// `#[repr(u8)]` keeps the discriminant stable; it is serialized as a bare
/// integer in the store's metadata file.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ColumnType {
    Int8 = 0,
    Uint8 = 1,
    Int16 = 2,
    Uint16 = 3,
    Int32 = 4,
    Uint32 = 5,
    Int64 = 6,
    Uint64 = 7,
    Float32 = 8,
    Float64 = 9,
}

impl ColumnType {
    /// The number of bytes values of this kind occupy on disk.
    pub fn size(&self) -> usize {
        match self {
            ColumnType::Int8 | ColumnType::Uint8 => 1,
            ColumnType::Int16 | ColumnType::Uint16 => 2,
            ColumnType::Int32 | ColumnType::Uint32 | ColumnType::Float32 => 4,
            ColumnType::Int64 | ColumnType::Uint64 | ColumnType::Float64 => 8,
        }
    }
}

impl From<ColumnType> for u8 {
    fn from(kind: ColumnType) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for ColumnType {
    type Error = eyre::Report;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ColumnType::Int8),
            1 => Ok(ColumnType::Uint8),
            2 => Ok(ColumnType::Int16),
            3 => Ok(ColumnType::Uint16),
            4 => Ok(ColumnType::Int32),
            5 => Ok(ColumnType::Uint32),
            6 => Ok(ColumnType::Int64),
            7 => Ok(ColumnType::Uint64),
            8 => Ok(ColumnType::Float32),
            9 => Ok(ColumnType::Float64),
            _ => eyre::bail!("invalid ColumnType discriminant: {}", value),
        }
    }
}

/// Metadata describing one column of a store: a query-addressable name, a
/// kind, and the encoded default value written into every row at creation.
///
/// Field names in the serialized form are capitalized to match the sidecar
/// files the original file format produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Type")]
    column_type: ColumnType,
    #[serde(rename = "Default")]
    default: Value,
}

impl Column {
    /// Builds a column from an already-encoded default value, rejecting
    /// defaults whose length does not match the kind's size.
    pub fn from_encoded(
        name: impl Into<String>,
        column_type: ColumnType,
        default: Value,
    ) -> Result<Self> {
        if default.len() != column_type.size() {
            return Err(Error::ValueSizeMismatch {
                expected: column_type.size(),
                actual: default.len(),
            }
            .into());
        }
        Ok(Self {
            name: name.into(),
            column_type,
            default,
        })
    }

    pub fn int8(name: impl Into<String>, default: i8) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Int8,
            default: Value::from_i8(default),
        }
    }

    pub fn uint8(name: impl Into<String>, default: u8) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Uint8,
            default: Value::from_u8(default),
        }
    }

    pub fn int16(name: impl Into<String>, default: i16) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Int16,
            default: Value::from_i16(default),
        }
    }

    pub fn uint16(name: impl Into<String>, default: u16) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Uint16,
            default: Value::from_u16(default),
        }
    }

    pub fn int32(name: impl Into<String>, default: i32) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Int32,
            default: Value::from_i32(default),
        }
    }

    pub fn uint32(name: impl Into<String>, default: u32) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Uint32,
            default: Value::from_u32(default),
        }
    }

    pub fn int64(name: impl Into<String>, default: i64) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Int64,
            default: Value::from_i64(default),
        }
    }

    pub fn uint64(name: impl Into<String>, default: u64) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Uint64,
            default: Value::from_u64(default),
        }
    }

    pub fn float32(name: impl Into<String>, default: f32) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Float32,
            default: Value::from_f32(default),
        }
    }

    pub fn float64(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Float64,
            default: Value::from_f64(default),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn default(&self) -> &Value {
        &self.default
    }

    /// The number of bytes values of this column occupy on disk.
    pub fn size(&self) -> usize {
        self.column_type.size()
    }
}
