//! # Values, Rows and Projections
//!
//! A [`Value`] is one cell's bytes: big-endian two's-complement for integers,
//! big-endian IEEE-754 bit patterns for floats. The buffer length always
//! equals the size of some [`ColumnType`](super::ColumnType); the typed
//! accessors reinterpret the bytes and make no attempt to guess what was
//! stored. Reading a value through the wrong-width accessor is a programmer
//! error and panics.
//!
//! A [`Row`] is the concatenation of every column's value in schema order.
//! Rows are fixed-width for the life of a store, so a [`Projection`] — the
//! ordered list of byte spans for a set of requested columns — can be
//! resolved once and applied to any number of rows.
//!
//! ## Encoding Round-Trip
//!
//! For every kind, `decode(encode(v)) == v` bit-exactly. Floats round-trip
//! through `to_bits`/`from_bits`, so NaN payloads survive storage unchanged.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One cell of storage: an owned byte buffer whose length matches a
/// [`ColumnType`](super::ColumnType) size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value(Vec<u8>);

impl Value {
    /// Wraps already-encoded bytes without validation.
    pub fn from_encoded(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_i8(v: i8) -> Self {
        Self(vec![v as u8])
    }

    pub fn from_u8(v: u8) -> Self {
        Self(vec![v])
    }

    pub fn from_i16(v: i16) -> Self {
        Self(v.to_be_bytes().to_vec())
    }

    pub fn from_u16(v: u16) -> Self {
        Self(v.to_be_bytes().to_vec())
    }

    pub fn from_i32(v: i32) -> Self {
        Self(v.to_be_bytes().to_vec())
    }

    pub fn from_u32(v: u32) -> Self {
        Self(v.to_be_bytes().to_vec())
    }

    pub fn from_i64(v: i64) -> Self {
        Self(v.to_be_bytes().to_vec())
    }

    pub fn from_u64(v: u64) -> Self {
        Self(v.to_be_bytes().to_vec())
    }

    pub fn from_f32(v: f32) -> Self {
        Self::from_u32(v.to_bits())
    }

    pub fn from_f64(v: f64) -> Self {
        Self::from_u64(v.to_bits())
    }

    pub fn as_i8(&self) -> i8 {
        self.0[0] as i8
    }

    pub fn as_u8(&self) -> u8 {
        self.0[0]
    }

    pub fn as_i16(&self) -> i16 {
        i16::from_be_bytes(self.fixed())
    }

    pub fn as_u16(&self) -> u16 {
        u16::from_be_bytes(self.fixed())
    }

    pub fn as_i32(&self) -> i32 {
        i32::from_be_bytes(self.fixed())
    }

    pub fn as_u32(&self) -> u32 {
        u32::from_be_bytes(self.fixed())
    }

    pub fn as_i64(&self) -> i64 {
        i64::from_be_bytes(self.fixed())
    }

    pub fn as_u64(&self) -> u64 {
        u64::from_be_bytes(self.fixed())
    }

    pub fn as_f32(&self) -> f32 {
        f32::from_bits(self.as_u32())
    }

    pub fn as_f64(&self) -> f64 {
        f64::from_bits(self.as_u64())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn fixed<const N: usize>(&self) -> [u8; N] {
        self.0[..N].try_into().expect("value narrower than accessor width")
    }
}

/// The byte span of one requested column within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    pub(crate) index: usize,
    pub(crate) start: usize,
    pub(crate) size: usize,
}

impl ColumnSpan {
    /// Position of the column in the store's schema.
    pub fn column_index(&self) -> usize {
        self.index
    }

    /// Byte offset of the column within a row.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Width of the column in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// An ordered selection of column spans, resolved once against a store's
/// schema and applied to any row. Duplicate columns are permitted and keep
/// their request order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection(SmallVec<[ColumnSpan; 8]>);

impl Projection {
    pub(crate) fn from_spans(spans: SmallVec<[ColumnSpan; 8]>) -> Self {
        Self(spans)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSpan> {
        self.0.iter()
    }
}

/// One record's raw bytes: every column's value concatenated in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row(Vec<u8>);

impl Row {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Slices the projected spans out of this row, in projection order.
    pub fn project(&self, projection: &Projection) -> Vec<Value> {
        projection
            .iter()
            .map(|span| Value::from_encoded(self.0[span.start..span.start + span.size].to_vec()))
            .collect()
    }
}
