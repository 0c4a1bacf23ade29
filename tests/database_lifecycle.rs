//! # Database Lifecycle Tests
//!
//! Create/open/list/drop behavior of the directory registry, and durability
//! of table contents and metadata across a full close/reopen cycle driven
//! through the database layer.

use pixidb::{
    Column, Database, Error, FlatHealpixIndexer, HealpixScheme, Location, ProjectionlessIndexer,
    Value,
};
use tempfile::tempdir;

#[test]
fn reopen_lists_exactly_the_created_tables() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("db");
    {
        let db = Database::create(&root).unwrap();
        db.create_table(
            "hello",
            ProjectionlessIndexer::new(10, 10, true),
            vec![Column::int32("col1", 6)],
        )
        .unwrap();
        db.create_table(
            "goodbye",
            FlatHealpixIndexer::new(1, HealpixScheme::Nest).unwrap(),
            vec![Column::uint16("col1", 3)],
        )
        .unwrap();
    }

    let db = Database::open(&root).unwrap();
    let mut names = db.table_names();
    names.sort();
    assert_eq!(names, vec!["goodbye", "hello"]);

    let hello = db.columns("hello").unwrap();
    assert_eq!(hello.len(), 1);
    assert_eq!(hello[0].name(), "col1");
    assert_eq!(
        db.get_rows("hello", &["col1"], &[Location::Index(42)]).unwrap().rows[0][0].as_i32(),
        6
    );
    assert_eq!(
        db.get_rows("goodbye", &["col1"], &[Location::Index(47)]).unwrap().rows[0][0].as_u16(),
        3
    );
}

#[test]
fn checkpoint_makes_writes_durable() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("db");
    {
        let db = Database::create(&root).unwrap();
        db.create_table(
            "grid",
            ProjectionlessIndexer::new(10, 10, true),
            vec![Column::int32("col1", 0)],
        )
        .unwrap();

        let written = db
            .set_rows(
                "grid",
                &["col1"],
                &[Location::Grid { x: 3, y: 4 }, Location::Grid { x: 9, y: 9 }],
                &[vec![Value::from_i32(11)], vec![Value::from_i32(22)]],
            )
            .unwrap();
        assert_eq!(written, 2);
        db.checkpoint().unwrap();
    }

    let db = Database::open(&root).unwrap();
    let result = db
        .get_rows(
            "grid",
            &["col1"],
            &[
                Location::Grid { x: 3, y: 4 },
                Location::Grid { x: 9, y: 9 },
                Location::Grid { x: 0, y: 0 },
            ],
        )
        .unwrap();
    assert_eq!(result.rows[0][0].as_i32(), 11);
    assert_eq!(result.rows[1][0].as_i32(), 22);
    assert_eq!(result.rows[2][0].as_i32(), 0);
}

#[test]
fn metadata_survives_reopen() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("db");
    {
        let db = Database::create(&root).unwrap();
        db.create_table(
            "tagged",
            ProjectionlessIndexer::new(4, 4, true),
            vec![Column::int8("col1", 0)],
        )
        .unwrap();
        db.set_metadata("tagged", "one", "fish").unwrap();
        db.set_metadata("tagged", "two", "fish").unwrap();
    }

    let db = Database::open(&root).unwrap();
    assert_eq!(db.get_metadata("tagged", "one").unwrap(), "fish");
    assert_eq!(db.get_metadata("tagged", "two").unwrap(), "fish");
    assert_eq!(db.get_metadata("tagged", "projection").unwrap(), "projectionless");
    let created = db.get_metadata("tagged", "created-at").unwrap();
    assert!(created.ends_with('Z'));
}

#[test]
fn dropped_tables_stay_gone_after_reopen() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("db");
    {
        let db = Database::create(&root).unwrap();
        for name in ["keep", "toss"] {
            db.create_table(
                name,
                ProjectionlessIndexer::new(4, 4, true),
                vec![Column::int8("col1", 0)],
            )
            .unwrap();
        }
        db.drop_table("toss").unwrap();
    }

    let db = Database::open(&root).unwrap();
    assert_eq!(db.table_names(), vec!["keep"]);
    let err = db.columns("toss").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::TableNotFound(_))
    ));
}

#[test]
fn create_on_existing_root_starts_fresh() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("db");
    {
        let db = Database::create(&root).unwrap();
        db.create_table(
            "old",
            ProjectionlessIndexer::new(4, 4, true),
            vec![Column::int8("col1", 0)],
        )
        .unwrap();
    }

    let db = Database::create(&root).unwrap();
    assert!(db.table_names().is_empty());
    assert!(!root.join("old").exists());
}
