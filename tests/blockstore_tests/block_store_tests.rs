//! Tests for BlockStore
//!
//! These tests verify:
//! - Appended data is readable before and after it is persisted
//! - Binary and line-aware chunking of the appendix
//! - Byte-range reads across segment and appendix boundaries
//! - Segment naming, the index object, and reopen
//! - Delete, seal, and the batch helpers

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use atlasblob::blockstore::{BlockStore, DEFAULT_BLOCK_SIZE};
use atlasblob::cache::ObjectCache;
use atlasblob::codec::{Decoded, TextShape};
use atlasblob::BlobError;
use tempfile::TempDir;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store(block_size: usize) -> (TempDir, Arc<ObjectCache>, BlockStore) {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(ObjectCache::new(16));
    let store = BlockStore::open(Arc::clone(&cache), temp_dir.path().join("Big.bin"), block_size).unwrap();
    (temp_dir, cache, store)
}

/// Alphabet split as 18 persisted bytes (segments of 4) plus 8 in the appendix
fn setup_alphabet_store() -> (TempDir, Arc<ObjectCache>, BlockStore) {
    let (temp, cache, store) = setup_temp_store(4);
    store.append(&ALPHABET[..18]).unwrap();
    store.write_appendix().unwrap();
    store.append(&ALPHABET[18..]).unwrap();
    (temp, cache, store)
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_requires_extension() {
    let temp = TempDir::new().unwrap();
    let cache = Arc::new(ObjectCache::new(4));

    let result = BlockStore::open(Arc::clone(&cache), temp.path().join("Big"), 4);
    assert!(matches!(result, Err(BlobError::InvalidName(_))));

    let result = BlockStore::open(cache, temp.path().join(".bin"), 4);
    assert!(matches!(result, Err(BlobError::InvalidName(_))));
}

#[test]
fn test_zero_block_size_selects_default() {
    let (_temp, _cache, store) = setup_temp_store(0);
    assert_eq!(store.block_size(), DEFAULT_BLOCK_SIZE);
}

#[test]
fn test_new_store_is_empty() {
    let (_temp, _cache, store) = setup_temp_store(4);

    assert_eq!(store.num_segments(), 0);
    assert_eq!(store.total_size(), 0);
    assert_eq!(store.read_all().unwrap(), None);
    assert_eq!(store.read_segment(0).unwrap(), None);
}

// =============================================================================
// Append and Chunking Tests
// =============================================================================

#[test]
fn test_append_stays_in_appendix() {
    let (temp, _cache, store) = setup_temp_store(4);

    store.append(b"0123456789").unwrap();

    assert_eq!(store.segment_count(), 0);
    assert_eq!(store.num_segments(), 1);
    assert_eq!(store.appendix_len(), 10);
    assert_eq!(store.read_all().unwrap().as_deref(), Some(&b"0123456789"[..]));
    assert_eq!(store.read_segment(0).unwrap().as_deref(), Some(&b"0123456789"[..]));
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn test_binary_chunks_at_block_size() {
    let (_temp, _cache, store) = setup_temp_store(4);
    store.append(b"0123456789").unwrap();

    assert_eq!(store.write_appendix().unwrap(), 3);

    assert_eq!(store.segment_sizes(), vec![4, 4, 2]);
    assert_eq!(store.appendix_len(), 0);
    assert_eq!(store.physical_size(), 10);
    assert_eq!(store.read_segment(1).unwrap().as_deref(), Some(&b"4567"[..]));
    assert_eq!(store.read_segment(3).unwrap(), None);
}

#[test]
fn test_text_segments_end_at_line_boundaries() {
    let (_temp, _cache, store) = setup_temp_store(16);
    let lines: Vec<String> = (0..10).map(|i| format!("line-{:02}", i)).collect();
    store.append(lines.clone()).unwrap();
    store.flush(false).unwrap();

    for i in 0..store.segment_count() {
        let segment = store.read_segment(i).unwrap().unwrap();
        assert!(segment.len() <= 16);
        assert_eq!(segment.last(), Some(&b'\n'));
    }

    let all = store.read_all().unwrap().unwrap();
    assert_eq!(
        atlasblob::codec::decode(&all, TextShape::Lines).unwrap(),
        Decoded::Lines(lines)
    );
}

#[test]
fn test_long_line_gets_its_own_segment() {
    let (_temp, _cache, store) = setup_temp_store(8);
    let long = "x".repeat(20);
    store
        .append(vec!["short".to_string(), long.clone(), "tail".to_string()])
        .unwrap();
    store.flush(false).unwrap();

    assert_eq!(store.segment_sizes(), vec![6, 21, 5]);
    assert_eq!(
        store.read_segment_as(1, TextShape::Text).unwrap().unwrap().as_text(),
        Some(format!("{}\n", long).as_str())
    );
}

#[test]
fn test_text_switches_store_to_line_chunking() {
    let (_temp, _cache, store) = setup_temp_store(4);
    store.append(b"ab").unwrap();
    store.append("cd\nef").unwrap();

    store.write_appendix().unwrap();

    // "abcd\n" cannot be cut inside the line, "ef\n" follows
    assert_eq!(store.segment_sizes(), vec![5, 3]);
}

// =============================================================================
// Range Read Tests
// =============================================================================

#[test]
fn test_every_range_matches_source() {
    let (_temp, _cache, store) = setup_alphabet_store();
    assert_eq!(store.segment_sizes(), vec![4, 4, 4, 4, 2]);
    assert_eq!(store.appendix_len(), 8);

    let len = ALPHABET.len() as i64;
    for a in 0..=len {
        for b in 0..=len {
            let got = store.read_range(Some(a), Some(b)).unwrap();
            if a < b {
                assert_eq!(
                    got.as_deref(),
                    Some(&ALPHABET[a as usize..b as usize]),
                    "range [{}, {})",
                    a,
                    b
                );
            } else {
                assert_eq!(got, None, "range [{}, {})", a, b);
            }
        }
    }
}

#[test]
fn test_open_and_negative_bounds() {
    let (_temp, _cache, store) = setup_alphabet_store();

    assert_eq!(store.read_all().unwrap().as_deref(), Some(ALPHABET));
    assert_eq!(store.read_range(Some(-3), None).unwrap().as_deref(), Some(&b"xyz"[..]));
    assert_eq!(store.read_range(None, Some(-24)).unwrap().as_deref(), Some(&b"ab"[..]));
    assert_eq!(store.read_range(Some(-10), Some(-8)).unwrap().as_deref(), Some(&b"qr"[..]));
    assert_eq!(store.read_range(Some(5), Some(-20)).unwrap().as_deref(), Some(&b"f"[..]));
}

#[test]
fn test_out_of_bounds_ranges() {
    let (_temp, _cache, store) = setup_alphabet_store();

    assert_eq!(store.read_range(Some(0), Some(27)).unwrap(), None);
    assert_eq!(store.read_range(Some(-100), None).unwrap(), None);
    assert_eq!(store.read_range(Some(30), None).unwrap(), None);
    assert_eq!(store.read_range(Some(10), Some(10)).unwrap(), None);
}

#[test]
fn test_missing_segment_is_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("Big.bin");
    {
        let store = BlockStore::open(Arc::new(ObjectCache::new(4)), &path, 4).unwrap();
        store.append(b"01234567").unwrap();
        store.close().unwrap();
    }
    fs::remove_file(temp.path().join("Big.0000001.bin")).unwrap();

    let store = BlockStore::open(Arc::new(ObjectCache::new(4)), &path, 4).unwrap();
    assert_eq!(store.read_segment(0).unwrap().as_deref(), Some(&b"0123"[..]));
    assert!(matches!(store.read_segment(1), Err(BlobError::MissingSegment(_))));
    assert!(matches!(store.read_all(), Err(BlobError::MissingSegment(_))));
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_segment_names_and_index_contents() {
    let (temp, _cache, store) = setup_temp_store(4);
    store.append(b"0123456789").unwrap();

    store.close().unwrap();

    for (name, data) in [
        ("Big.0000000.bin", &b"0123"[..]),
        ("Big.0000001.bin", &b"4567"[..]),
        ("Big.0000002.bin", &b"89"[..]),
    ] {
        assert_eq!(fs::read(temp.path().join(name)).unwrap(), data);
    }
    let index = fs::read_to_string(temp.path().join("Big.bin.index.csv")).unwrap();
    assert_eq!(index, "Big.0000000.bin,4\nBig.0000001.bin,4\nBig.0000002.bin,2\n");
}

#[test]
fn test_flush_without_cache_keeps_objects_in_memory() {
    let (temp, cache, store) = setup_temp_store(4);
    store.append(b"0123").unwrap();

    store.flush(false).unwrap();

    assert_eq!(store.segment_count(), 1);
    assert!(cache.is_dirty(temp.path().join("Big.0000000.bin")));
    assert!(cache.is_dirty(store.index_path()));
    assert!(!store.index_path().exists());
}

#[test]
fn test_reopen_restores_segments_and_continues_ids() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("Big.bin");

    {
        let store = BlockStore::open(Arc::new(ObjectCache::new(8)), &path, 4).unwrap();
        store.append(b"0123456789").unwrap();
        store.close().unwrap();
    }

    let store = BlockStore::open(Arc::new(ObjectCache::new(8)), &path, 4).unwrap();
    assert_eq!(store.segment_sizes(), vec![4, 4, 2]);
    assert_eq!(store.next_segment_id(), 3);
    assert_eq!(store.read_all().unwrap().as_deref(), Some(&b"0123456789"[..]));

    store.append(b"ab").unwrap();
    store.close().unwrap();
    assert_eq!(fs::read(temp.path().join("Big.0000003.bin")).unwrap(), b"ab");

    let store = BlockStore::open(Arc::new(ObjectCache::new(8)), &path, 4).unwrap();
    assert_eq!(store.read_all().unwrap().as_deref(), Some(&b"0123456789ab"[..]));
}

#[test]
fn test_drop_flushes_into_shared_cache() {
    let temp = TempDir::new().unwrap();
    let cache = Arc::new(ObjectCache::new(8));
    let path = temp.path().join("Big.bin");

    {
        let store = BlockStore::open(Arc::clone(&cache), &path, 4).unwrap();
        store.append(b"012345").unwrap();
    }

    // Nothing on disk yet, but a store on the same cache sees the data
    assert!(!temp.path().join("Big.0000000.bin").exists());
    let store = BlockStore::open(Arc::clone(&cache), &path, 4).unwrap();
    assert_eq!(store.read_all().unwrap().as_deref(), Some(&b"012345"[..]));
}

#[test]
fn test_corrupt_index_is_rejected() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("Big.bin.index.csv"), "Big.0000000.bin,notanumber\n").unwrap();

    let result = BlockStore::open(Arc::new(ObjectCache::new(4)), temp.path().join("Big.bin"), 4);
    assert!(matches!(result, Err(BlobError::CorruptIndex(_))));
}

// =============================================================================
// Seal Tests
// =============================================================================

#[test]
fn test_seal_writes_one_segment_regardless_of_block_size() {
    let (_temp, _cache, store) = setup_temp_store(4);
    store.append(b"0123456789").unwrap();

    assert!(store.seal_appendix().unwrap());
    assert_eq!(store.segment_sizes(), vec![10]);
    assert!(!store.seal_appendix().unwrap());
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_unflushed_segments_skips_disk() {
    let (temp, cache, store) = setup_temp_store(4);
    store.append(b"0123456789").unwrap();
    store.write_appendix().unwrap();

    store.delete().unwrap();

    assert_eq!(store.segment_count(), 0);
    assert_eq!(store.next_segment_id(), 0);
    assert_eq!(store.read_all().unwrap(), None);
    assert!(cache.is_empty());
    assert_eq!(cache.stats().disk_deletes, 0);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn test_delete_removes_persisted_objects_and_resets_ids() {
    let (temp, cache, store) = setup_temp_store(4);
    store.append(b"01234567").unwrap();
    store.flush(true).unwrap();
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 3);

    store.delete().unwrap();

    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    assert_eq!(cache.stats().disk_deletes, 3);

    store.append(b"new").unwrap();
    store.close().unwrap();
    assert_eq!(fs::read(temp.path().join("Big.0000000.bin")).unwrap(), b"new");
}

// =============================================================================
// Batch Helper Tests
// =============================================================================

#[test]
fn test_flush_and_delete_stores() {
    let temp = TempDir::new().unwrap();
    let cache = Arc::new(ObjectCache::new(16));
    let paths: Vec<PathBuf> = ["One.bin", "Two.bin"]
        .iter()
        .map(|name| temp.path().join(name))
        .collect();

    for path in &paths {
        let store = BlockStore::open(Arc::clone(&cache), path, 4).unwrap();
        store.append(b"012345").unwrap();
    }
    let all = [paths[0].clone(), paths[1].clone(), temp.path().join("Unused.bin")];
    assert_eq!(BlockStore::flush_stores(&cache, &all, true).unwrap(), 2);
    assert!(temp.path().join("One.0000001.bin").exists());
    assert!(temp.path().join("Two.bin.index.csv").exists());

    assert_eq!(BlockStore::delete_stores(&cache, &all).unwrap(), 2);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
}
