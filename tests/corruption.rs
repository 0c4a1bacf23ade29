//! # Corruption Detection Tests
//!
//! Every disk read re-derives the page checksum, so any byte flipped in a
//! page's on-disk payload — or in the stored checksum itself — must surface
//! as a corrupted-page error on the next uncached read. Pages that were not
//! touched keep working.

use std::fs::OpenOptions;
use std::os::unix::fs::FileExt;
use std::path::Path;

use pixidb::{Column, Error, Location, ProjectionlessIndexer, Table, Value};
use tempfile::tempdir;

const CHECKSUM_SIZE: u64 = 4;

fn flip_byte(path: &Path, offset: u64) {
    let file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    let mut byte = [0u8; 1];
    file.read_exact_at(&mut byte, offset).unwrap();
    byte[0] ^= 0x01;
    file.write_all_at(&byte, offset).unwrap();
}

fn is_corrupted_page(err: &eyre::Report, page: usize) -> bool {
    matches!(
        err.downcast_ref::<Error>(),
        Some(Error::CorruptedPage { page: p }) if *p == page
    )
}

#[test]
fn payload_bit_flip_fails_reads_of_that_page() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fragile");
    {
        let table = Table::create(
            path.clone(),
            ProjectionlessIndexer::new(10, 10, true),
            vec![Column::int32("col1", 3)],
        )
        .unwrap();
        table
            .set_value("col1", Location::Index(0), &Value::from_i32(5))
            .unwrap();
        table.checkpoint().unwrap();
    }

    // Flip one payload byte of page 0 behind the engine's back.
    flip_byte(&path.join("fragile.dat"), CHECKSUM_SIZE + 17);

    let table = Table::open(&path).unwrap();
    let err = table
        .get_rows(&["col1"], &[Location::Index(0)])
        .unwrap_err();
    assert!(is_corrupted_page(&err, 0), "unexpected error: {err:?}");
}

#[test]
fn checksum_bit_flip_is_equally_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fragile");
    Table::create(
        path.clone(),
        ProjectionlessIndexer::new(10, 10, true),
        vec![Column::int32("col1", 3)],
    )
    .unwrap();

    flip_byte(&path.join("fragile.dat"), 0);

    let table = Table::open(&path).unwrap();
    let err = table
        .get_rows(&["col1"], &[Location::Index(0)])
        .unwrap_err();
    assert!(is_corrupted_page(&err, 0), "unexpected error: {err:?}");
}

#[test]
fn untouched_pages_keep_reading_after_corruption_elsewhere() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mostly-fine");
    // A wide row keeps rows-per-page small enough that a modest grid spans
    // several pages.
    let columns: Vec<Column> = (0..64).map(|i| Column::int64(format!("c{}", i), i)).collect();
    let rows_per_page;
    {
        let table = Table::create(
            path.clone(),
            ProjectionlessIndexer::new(64, 2, true),
            columns,
        )
        .unwrap();
        table.checkpoint().unwrap();
        rows_per_page = pixidb::Store::open(&path).unwrap().rows_per_page();
    }
    assert!(rows_per_page < 128, "grid must span multiple pages");

    flip_byte(&path.join("mostly-fine.dat"), CHECKSUM_SIZE + 1);

    let table = Table::open(&path).unwrap();
    // Page 0 is poisoned.
    let err = table.get_rows(&["c0"], &[Location::Index(0)]).unwrap_err();
    assert!(is_corrupted_page(&err, 0), "unexpected error: {err:?}");
    // A row on the next page still reads its default.
    let result = table
        .get_rows(&["c3"], &[Location::Index(rows_per_page as i64)])
        .unwrap();
    assert_eq!(result.rows[0][0].as_i64(), 3);
}

#[test]
fn unflushed_corruption_is_invisible_until_cache_miss() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cached");
    let table = Table::create(
        path.clone(),
        ProjectionlessIndexer::new(10, 10, true),
        vec![Column::int32("col1", 3)],
    )
    .unwrap();

    // Warm the cache, then corrupt the disk copy. Cached reads keep
    // succeeding; only a fresh disk read notices.
    assert_eq!(
        table.get_rows(&["col1"], &[Location::Index(0)]).unwrap().rows[0][0].as_i32(),
        3
    );
    flip_byte(&path.join("cached.dat"), CHECKSUM_SIZE + 2);
    assert_eq!(
        table.get_rows(&["col1"], &[Location::Index(1)]).unwrap().rows[0][0].as_i32(),
        3
    );

    let reopened = Table::open(&path).unwrap();
    assert!(reopened.get_rows(&["col1"], &[Location::Index(0)]).is_err());
}
