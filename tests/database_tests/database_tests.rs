//! Tests for Database table lifecycle, inserts and persistence
//!
//! These tests verify:
//! - create_table / drop_table keep the TOC, Entity cache and blocks coherent
//! - Inserts validate every row before writing anything
//! - Everything survives close and reopen
//! - Flushing is idempotent

use std::fs;
use std::path::PathBuf;

use cairndb::storage::{BlockType, Storage};
use cairndb::{Attribute, CairnError, Config, DataType, Database, SelectQuery, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shop.cdb");
    (dir, path)
}

fn people_schema() -> Vec<Attribute> {
    vec![
        Attribute::new("id", DataType::Int).primary_key().auto_increment(),
        Attribute::new("name", DataType::Varchar).not_null(),
        Attribute::new("age", DataType::Int).default_value(0),
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn insert_names(db: &mut Database, table: &str, names: &[&str]) -> usize {
    let fields = strings(&["name"]);
    let rows: Vec<Vec<String>> = names.iter().map(|n| strings(&[*n])).collect();
    db.insert_into_table(table, Some(fields.as_slice()), &rows)
        .unwrap()
}

// =============================================================================
// Table Lifecycle Tests
// =============================================================================

#[test]
fn test_create_table() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();

    db.create_table("people", people_schema()).unwrap();

    assert!(db.table_exists("people"));
    assert!(db.is_cached("people"));
    assert!(!db.toc().is_dirty());
    assert_eq!(db.toc().block_number_of("people").unwrap(), 1);
    assert_eq!(db.row_count("people").unwrap(), 0);
}

#[test]
fn test_create_existing_table_fails() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    db.create_table("people", people_schema()).unwrap();

    let result = db.create_table("people", people_schema());
    assert!(matches!(result, Err(CairnError::TableExists(name)) if name == "people"));
}

#[test]
fn test_create_table_with_bad_schema_writes_nothing() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();

    let result = db.create_table("t", vec![Attribute::new("a", DataType::Int).auto_increment()]);
    assert!(result.is_err());
    assert!(!db.table_exists("t"));
    assert_eq!(fs::metadata(&path).unwrap().len(), 1024);
}

#[test]
fn test_create_table_with_empty_name_fails() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    assert!(matches!(
        db.create_table("", people_schema()),
        Err(CairnError::InvalidArguments(_))
    ));
}

#[test]
fn test_drop_table_releases_blocks() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    db.create_table("t", people_schema()).unwrap();
    db.create_table("u", people_schema()).unwrap();
    insert_names(&mut db, "t", &["a", "b"]);

    let entity_block = db.toc().block_number_of("t").unwrap();
    let row_blocks = db.entity("t").unwrap().row_positions().to_vec();

    db.drop_table("u").unwrap();
    assert!(db.is_cached("t"));
    assert!(db.table_exists("t"));

    db.drop_table("t").unwrap();
    assert!(!db.is_cached("t"));
    assert!(!db.table_exists("t"));
    assert!(matches!(
        db.select_from_table("t", &SelectQuery::all()),
        Err(CairnError::UnknownTable(_))
    ));
    db.close().unwrap();

    let (mut storage, toc) = Storage::open(&path, &Config::default()).unwrap();
    assert!(toc.is_empty());
    assert_eq!(storage.block_type(entity_block).unwrap(), BlockType::Free);
    for n in row_blocks {
        assert_eq!(storage.block_type(n).unwrap(), BlockType::Free);
    }
}

#[test]
fn test_drop_unknown_table_fails() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    assert!(matches!(
        db.drop_table("ghost"),
        Err(CairnError::UnknownTable(_))
    ));
}

#[test]
fn test_dropped_blocks_are_reused() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    db.create_table("t", people_schema()).unwrap();
    let first = db.toc().block_number_of("t").unwrap();
    db.drop_table("t").unwrap();

    db.create_table("v", people_schema()).unwrap();
    assert_eq!(db.toc().block_number_of("v").unwrap(), first);
}

#[test]
fn test_drop_tables_checks_all_names_first() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    db.create_table("a", people_schema()).unwrap();
    db.create_table("b", people_schema()).unwrap();

    assert!(matches!(
        db.drop_tables(&["a", "missing"]),
        Err(CairnError::UnknownTable(_))
    ));
    assert!(db.table_exists("a"));

    assert!(matches!(
        db.drop_tables(&["a", "a"]),
        Err(CairnError::InvalidArguments(_))
    ));
    assert!(db.table_exists("a"));

    assert_eq!(db.drop_tables(&["a", "b"]).unwrap(), 2);
    assert!(db.table_names().is_empty());
}

#[test]
fn test_describe_table() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    db.create_table("people", people_schema()).unwrap();

    let attributes = db.describe_table("people").unwrap();
    let names: Vec<&str> = attributes.iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["id", "name", "age"]);
    assert_eq!(attributes[2].default(), &Value::Int(0));
}

// =============================================================================
// Insert Tests
// =============================================================================

#[test]
fn test_insert_fills_defaults_and_auto_increment() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    db.create_table("people", people_schema()).unwrap();

    assert_eq!(insert_names(&mut db, "people", &["Alice"]), 1);

    let result = db.select_from_table("people", &SelectQuery::all()).unwrap();
    assert_eq!(
        result.projected(),
        vec![vec![Value::Int(1), Value::from("Alice"), Value::Int(0)]]
    );
}

#[test]
fn test_insert_without_field_names_uses_declaration_order() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    db.create_table("people", people_schema()).unwrap();

    let rows = vec![strings(&["7", "Bob", "41"])];
    db.insert_into_table("people", None, &rows).unwrap();

    let result = db.select_from_table("people", &SelectQuery::all()).unwrap();
    assert_eq!(result.column("age"), vec![Value::Int(41)]);
    assert_eq!(db.entity("people").unwrap().auto_increment_counter(), 7);
}

#[test]
fn test_insert_missing_required_field_fails() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    db.create_table("people", people_schema()).unwrap();

    let fields = strings(&["age"]);
    let result = db.insert_into_table("people", Some(fields.as_slice()), &[strings(&["30"])]);

    assert!(matches!(result, Err(CairnError::InvalidArguments(_))));
    assert_eq!(db.entity("people").unwrap().auto_increment_counter(), 0);
    assert_eq!(db.row_count("people").unwrap(), 0);
}

#[test]
fn test_bad_row_in_batch_writes_nothing() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    db.create_table("people", people_schema()).unwrap();
    let size_before = fs::metadata(&path).unwrap().len();

    let fields = strings(&["name", "age"]);
    let rows = vec![strings(&["ok", "1"]), strings(&["bad", "old"])];
    let result = db.insert_into_table("people", Some(fields.as_slice()), &rows);

    assert!(matches!(result, Err(CairnError::TypeMismatch { .. })));
    assert_eq!(db.row_count("people").unwrap(), 0);
    assert_eq!(db.entity("people").unwrap().auto_increment_counter(), 0);
    assert_eq!(fs::metadata(&path).unwrap().len(), size_before);
}

#[test]
fn test_insert_into_unknown_table_fails() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    let result = db.insert_into_table("ghost", None, &[strings(&["1"])]);
    assert!(matches!(result, Err(CairnError::UnknownTable(_))));
}

#[test]
fn test_oversized_row_is_rejected_before_write() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    db.create_table("people", people_schema()).unwrap();

    let long_name = "n".repeat(4000);
    let fields = strings(&["name"]);
    let result = db.insert_into_table("people", Some(fields.as_slice()), &[vec![long_name]]);

    let err = result.unwrap_err();
    assert!(matches!(&err, CairnError::RowTooLarge(table) if table == "people"));
    assert!(!err.is_fatal());
    assert_eq!(db.row_count("people").unwrap(), 0);
    assert_eq!(db.entity("people").unwrap().auto_increment_counter(), 0);
}

#[test]
fn test_batch_that_overflows_entity_writes_nothing() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    db.create_table(
        "ids",
        vec![Attribute::new("id", DataType::Int).primary_key().auto_increment()],
    )
    .unwrap();
    let size_before = fs::metadata(&path).unwrap().len();

    let fields: Vec<String> = Vec::new();
    let rows = vec![Vec::new(); 300];
    let err = db
        .insert_into_table("ids", Some(fields.as_slice()), &rows)
        .unwrap_err();

    assert!(matches!(err, CairnError::TableFull { additional: 300, .. }));
    assert!(!err.is_fatal());
    assert_eq!(db.row_count("ids").unwrap(), 0);
    assert_eq!(db.entity("ids").unwrap().auto_increment_counter(), 0);
    assert_eq!(fs::metadata(&path).unwrap().len(), size_before);
    db.flush().unwrap();
}

#[test]
fn test_full_table_keeps_its_rows_across_reopen() {
    let (_dir, path) = setup();
    let fields: Vec<String> = Vec::new();
    let one_row = vec![Vec::new()];
    let mut inserted = 0;
    {
        let mut db = Database::create(&path, &Config::default()).unwrap();
        db.create_table(
            "ids",
            vec![Attribute::new("id", DataType::Int).primary_key().auto_increment()],
        )
        .unwrap();

        loop {
            match db.insert_into_table("ids", Some(fields.as_slice()), &one_row) {
                Ok(n) => inserted += n,
                Err(e) => {
                    assert!(matches!(e, CairnError::TableFull { .. }));
                    break;
                }
            }
            assert!(inserted < 1024, "entity never filled up");
        }
        assert!(inserted > 200);
        db.close().unwrap();
    }

    let mut db = Database::open(&path, &Config::default()).unwrap();
    assert_eq!(db.row_count("ids").unwrap(), inserted);
    let result = db.select_from_table("ids", &SelectQuery::all()).unwrap();
    assert_eq!(result.len(), inserted);
    assert!(matches!(
        db.insert_into_table("ids", Some(fields.as_slice()), &one_row),
        Err(CairnError::TableFull { .. })
    ));

    db.delete_from_table("ids", None).unwrap();
    assert_eq!(
        db.insert_into_table("ids", Some(fields.as_slice()), &one_row)
            .unwrap(),
        1
    );
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_data_survives_reopen() {
    let (_dir, path) = setup();
    {
        let mut db = Database::create(&path, &Config::default()).unwrap();
        db.create_table("people", people_schema()).unwrap();
        insert_names(&mut db, "people", &["Alice", "Bob"]);
        db.close().unwrap();
    }

    let mut db = Database::open(&path, &Config::default()).unwrap();
    assert_eq!(db.table_names(), vec!["people"]);
    assert!(!db.is_cached("people"));

    let result = db.select_from_table("people", &SelectQuery::all()).unwrap();
    assert_eq!(result.column("name"), vec![Value::from("Alice"), Value::from("Bob")]);

    insert_names(&mut db, "people", &["Carol"]);
    let result = db
        .select_from_table(
            "people",
            &SelectQuery::all().filter(cairndb::Filter::eq("name", "Carol")),
        )
        .unwrap();
    assert_eq!(result.column("id"), vec![Value::Int(3)]);
}

#[test]
fn test_drop_flushes_dirty_entities() {
    let (_dir, path) = setup();
    {
        let mut db = Database::create(&path, &Config::default()).unwrap();
        db.create_table("people", people_schema()).unwrap();
        insert_names(&mut db, "people", &["Alice"]);
    }

    let mut db = Database::open(&path, &Config::default()).unwrap();
    assert_eq!(db.row_count("people").unwrap(), 1);
}

#[test]
fn test_flush_is_idempotent() {
    let (_dir, path) = setup();
    let mut db = Database::create(&path, &Config::default()).unwrap();
    db.create_table("people", people_schema()).unwrap();
    insert_names(&mut db, "people", &["Alice", "Bob"]);

    db.flush().unwrap();
    let first = fs::read(&path).unwrap();
    assert!(!db.toc().is_dirty());
    assert!(!db.entity("people").unwrap().is_dirty());

    db.flush().unwrap();
    let second = fs::read(&path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_open_missing_database_fails() {
    let (_dir, path) = setup();
    assert!(matches!(
        Database::open(&path, &Config::default()),
        Err(CairnError::Open { .. })
    ));
}
