//! Tests for Toc
//!
//! These tests verify:
//! - Add/remove/lookup of table entries
//! - Dirty tracking
//! - Persistence through a TOC block

use cairndb::storage::{Block, MonoStorable, TOC_BLOCK};
use cairndb::{CairnError, Toc};

#[test]
fn test_new_toc_is_empty_and_clean() {
    let toc = Toc::new();
    assert!(toc.is_empty());
    assert!(!toc.is_dirty());
    assert_eq!(toc.block_number(), TOC_BLOCK);
}

#[test]
fn test_add_and_lookup() {
    let mut toc = Toc::new();
    toc.add("users", 1).unwrap();

    assert!(toc.contains("users"));
    assert_eq!(toc.block_number_of("users").unwrap(), 1);
    assert!(toc.is_dirty());
}

#[test]
fn test_add_existing_name_is_rejected() {
    let mut toc = Toc::new();
    toc.add("users", 1).unwrap();
    assert!(matches!(toc.add("users", 2), Err(CairnError::Invariant(_))));
    assert_eq!(toc.block_number_of("users").unwrap(), 1);
}

#[test]
fn test_lookup_missing_name_is_rejected() {
    let toc = Toc::new();
    assert!(matches!(
        toc.block_number_of("ghost"),
        Err(CairnError::Invariant(_))
    ));
}

#[test]
fn test_remove() {
    let mut toc = Toc::new();
    toc.add("users", 4).unwrap();
    toc.mark_clean();

    assert_eq!(toc.remove("users").unwrap(), 4);
    assert!(!toc.contains("users"));
    assert!(toc.is_dirty());
    assert!(toc.remove("users").is_err());
}

#[test]
fn test_table_names_are_sorted() {
    let mut toc = Toc::new();
    toc.add("zebra", 3).unwrap();
    toc.add("apple", 1).unwrap();
    toc.add("mango", 2).unwrap();

    let names: Vec<&str> = toc.table_names().collect();
    assert_eq!(names, vec!["apple", "mango", "zebra"]);

    let entries: Vec<(&str, i32)> = toc.entries().collect();
    assert_eq!(entries[0], ("apple", 1));
}

#[test]
fn test_persisted_toc_is_clean_and_complete() {
    let mut toc = Toc::new();
    for (i, name) in ["a", "b", "c"].iter().enumerate() {
        toc.add(name, i as i32 + 1).unwrap();
    }

    let block = Block::encode(&toc).unwrap();
    let decoded: Toc = block.decode().unwrap();

    assert_eq!(decoded.len(), 3);
    assert!(!decoded.is_dirty());
    assert_eq!(decoded.block_number_of("c").unwrap(), 3);
}

#[test]
fn test_set_block_number_is_ignored() {
    let mut toc = Toc::new();
    toc.set_block_number(12);
    assert_eq!(toc.block_number(), 0);
}
