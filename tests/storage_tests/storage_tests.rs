//! Tests for Storage
//!
//! These tests verify:
//! - File creation and reopening (TOC at block 0)
//! - Block reads/writes through the cache
//! - Free-block discovery by linear scan
//! - Traversal with early stop

use std::fs;
use std::path::{Path, PathBuf};

use cairndb::storage::{Block, BlockType, MonoStorable, Storage, Visit, BLOCK_SIZE};
use cairndb::{CairnError, Config, Row, SyncStrategy, Toc};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.cdb");
    (dir, path)
}

fn create(path: &Path) -> Storage {
    Storage::create(path, &Toc::new(), &Config::default()).unwrap()
}

fn fill_rows(storage: &mut Storage, through: i32) {
    let row = Block::new(BlockType::Row);
    for n in 1..=through {
        storage.write_block(&row, n).unwrap();
    }
}

// =============================================================================
// Create / Open Tests
// =============================================================================

#[test]
fn test_create_writes_toc_block() {
    let (_dir, path) = setup();
    let mut storage = create(&path);

    assert_eq!(storage.block_count().unwrap(), 1);
    assert_eq!(storage.block_type(0).unwrap(), BlockType::Toc);
    assert_eq!(fs::metadata(&path).unwrap().len(), BLOCK_SIZE as u64);
}

#[test]
fn test_reopen_reads_toc() {
    let (_dir, path) = setup();
    let mut toc = Toc::new();
    toc.add("users", 1).unwrap();
    toc.add("orders", 2).unwrap();
    drop(Storage::create(&path, &toc, &Config::default()).unwrap());

    let (_storage, reopened) = Storage::open(&path, &Config::default()).unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.block_number_of("users").unwrap(), 1);
    assert_eq!(reopened.block_number_of("orders").unwrap(), 2);
}

#[test]
fn test_create_truncates_existing_file() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    fill_rows(&mut storage, 5);
    drop(storage);

    let storage = create(&path);
    assert_eq!(storage.block_count().unwrap(), 1);
}

#[test]
fn test_open_missing_file_fails() {
    let (_dir, path) = setup();
    let result = Storage::open(&path, &Config::default());
    assert!(matches!(result, Err(CairnError::Open { .. })));
}

#[test]
fn test_open_rejects_non_toc_block_zero() {
    let (_dir, path) = setup();
    fs::write(&path, Block::new(BlockType::Row).as_bytes()).unwrap();

    let result = Storage::open(&path, &Config::default());
    assert!(matches!(
        result,
        Err(CairnError::BlockTypeMismatch {
            expected: BlockType::Toc,
            found: BlockType::Row
        })
    ));
}

#[test]
fn test_open_empty_file_fails() {
    let (_dir, path) = setup();
    fs::write(&path, b"").unwrap();

    let result = Storage::open(&path, &Config::default());
    assert!(matches!(result, Err(CairnError::Read { block: 0, .. })));
}

// =============================================================================
// Block I/O Tests
// =============================================================================

#[test]
fn test_write_then_read_block() {
    let (_dir, path) = setup();
    let mut storage = create(&path);

    let block = Block::encode(&Row::new(1)).unwrap();
    storage.write_block(&block, 1).unwrap();

    assert_eq!(storage.read_block(1).unwrap(), block);
    assert_eq!(storage.block_count().unwrap(), 2);
}

#[test]
fn test_written_block_survives_reopen() {
    let (_dir, path) = setup();
    let config = Config::builder().cache_capacity(0).build();
    let mut storage = Storage::create(&path, &Toc::new(), &config).unwrap();
    storage.write_block(&Block::new(BlockType::Entity), 1).unwrap();
    drop(storage);

    let (mut storage, _) = Storage::open(&path, &config).unwrap();
    assert_eq!(storage.block_type(1).unwrap(), BlockType::Entity);
}

#[test]
fn test_read_past_end_is_read_error() {
    let (_dir, path) = setup();
    let mut storage = create(&path);

    let err = storage.read_block(5).unwrap_err();
    assert!(matches!(err, CairnError::Read { block: 5, .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_negative_block_number_is_invariant_error() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    assert!(matches!(
        storage.read_block(-1),
        Err(CairnError::Invariant(_))
    ));
}

#[test]
fn test_repeated_reads_hit_cache() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    fill_rows(&mut storage, 1);

    storage.read_block(1).unwrap();
    storage.read_block(1).unwrap();
    assert_eq!(storage.cache_stats().hits, 2);
}

#[test]
fn test_every_write_sync_strategy() {
    let (_dir, path) = setup();
    let config = Config::builder()
        .sync_strategy(SyncStrategy::EveryWrite)
        .build();
    let mut storage = Storage::create(&path, &Toc::new(), &config).unwrap();
    storage.write_block(&Block::new(BlockType::Row), 1).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 2 * BLOCK_SIZE as u64);
}

// =============================================================================
// Free Block Tests
// =============================================================================

#[test]
fn test_fresh_file_allocates_block_one() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    assert_eq!(storage.find_free_block_number().unwrap(), 1);
}

#[test]
fn test_released_block_is_reused() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    fill_rows(&mut storage, 9);
    assert_eq!(storage.find_free_block_number().unwrap(), 10);

    storage.release_block(5).unwrap();
    assert!(storage.read_block(5).unwrap().is_free());
    assert_eq!(storage.find_free_block_number().unwrap(), 5);
}

#[test]
fn test_find_free_is_stable_without_write() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    let first = storage.find_free_block_number().unwrap();
    let second = storage.find_free_block_number().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_lowest_free_block_wins() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    fill_rows(&mut storage, 6);
    storage.release_block(4).unwrap();
    storage.release_block(2).unwrap();
    assert_eq!(storage.find_free_block_number().unwrap(), 2);
}

#[test]
fn test_release_toc_block_is_rejected() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    assert!(matches!(
        storage.release_block(0),
        Err(CairnError::Invariant(_))
    ));
    assert_eq!(storage.block_type(0).unwrap(), BlockType::Toc);
}

// =============================================================================
// Traversal Tests
// =============================================================================

#[test]
fn test_each_block_visits_in_order() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    fill_rows(&mut storage, 3);

    let mut seen = Vec::new();
    storage
        .each_block(|n, block| {
            seen.push((n, block.block_type()?));
            Ok(Visit::Continue)
        })
        .unwrap();

    assert_eq!(
        seen,
        vec![
            (0, BlockType::Toc),
            (1, BlockType::Row),
            (2, BlockType::Row),
            (3, BlockType::Row)
        ]
    );
}

#[test]
fn test_each_block_stops_early() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    fill_rows(&mut storage, 5);

    let mut visited = 0;
    storage
        .each_block(|n, _| {
            visited += 1;
            Ok(if n == 2 { Visit::Stop } else { Visit::Continue })
        })
        .unwrap();
    assert_eq!(visited, 3);
}

#[test]
fn test_each_block_propagates_visitor_error() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    fill_rows(&mut storage, 2);

    let result = storage.each_block(|n, _| {
        if n == 1 {
            Err(CairnError::Corrupt("bad block".to_string()))
        } else {
            Ok(Visit::Continue)
        }
    });
    assert!(matches!(result, Err(CairnError::Corrupt(_))));
}

#[test]
fn test_visit_blocks_subset() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    fill_rows(&mut storage, 6);

    let mut seen = Vec::new();
    storage
        .visit_blocks(&[5, 2, 4], |n, _| {
            seen.push(n);
            Ok(if seen.len() == 2 {
                Visit::Stop
            } else {
                Visit::Continue
            })
        })
        .unwrap();
    assert_eq!(seen, vec![5, 2]);
}

// =============================================================================
// Record Tests
// =============================================================================

#[test]
fn test_save_and_decode_mono_storable() {
    let (_dir, path) = setup();
    let mut storage = create(&path);

    let mut toc = Toc::new();
    toc.add("t", 3).unwrap();
    storage.save_mono_storable(&toc).unwrap();

    let decoded: Toc = storage.decode_mono_storable(0).unwrap();
    assert_eq!(decoded.block_number_of("t").unwrap(), 3);
}

#[test]
fn test_decode_sets_block_number() {
    let (_dir, path) = setup();
    let mut storage = create(&path);
    storage
        .write_block(&Block::encode(&Row::new(0)).unwrap(), 7)
        .unwrap();

    let row: Row = storage.decode_mono_storable(7).unwrap();
    assert_eq!(row.block_number(), 7);
}
