//! Tests for Store transactions
//!
//! These tests verify:
//! - Open rules (missing file, directory, empty file)
//! - Read/write transactions over nested buckets
//! - Leaf vs sub-bucket exclusivity
//! - Persistence across reopen, and read-only stores
//! - Snapshot isolation and concurrent readers

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::thread;

use monkey::config::{LogSyncStrategy, StoreConfig};
use monkey::store::log::create_store_file;
use monkey::store::{Entry, OpenMode, Store};
use monkey::MonkeyError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.bbolt");
    create_store_file(&path).unwrap();
    (temp_dir, path)
}

fn setup_temp_store() -> (TempDir, Store) {
    let (temp_dir, path) = setup_store_file();
    let store = Store::open(&path, OpenMode::ReadWrite).unwrap();
    (temp_dir, store)
}

/// `animals` holds two leaves and a `birds` sub-bucket with one leaf
fn populate(store: &Store) {
    store
        .update(|tx| {
            let mut animals = tx.create_bucket_if_not_exists(b"animals")?;
            animals.put(b"cat", b"meow")?;
            animals.put(b"dog", b"woof")?;
            let mut birds = animals.create_bucket_if_not_exists(b"birds")?;
            birds.put(b"owl", b"hoot")?;
            Ok(())
        })
        .unwrap();
}

fn leaf(store: &Store, path: &[&[u8]], key: &[u8]) -> Option<Vec<u8>> {
    store
        .view(|tx| Ok(tx.bucket_at(path).and_then(|b| b.get(key)).map(<[u8]>::to_vec)))
        .unwrap()
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.bbolt");

    let err = Store::open(&path, OpenMode::ReadOnly).err().unwrap();

    assert!(matches!(err, MonkeyError::StoreOpen { .. }));
    assert!(!path.exists());
}

#[test]
fn test_open_directory() {
    let temp_dir = TempDir::new().unwrap();

    let err = Store::open(temp_dir.path(), OpenMode::ReadOnly).err().unwrap();

    assert!(matches!(err, MonkeyError::StoreIsDirectory(_)));
}

#[test]
fn test_open_empty_file_read_only() {
    let (_temp, path) = setup_store_file();

    let store = Store::open(&path, OpenMode::ReadOnly).unwrap();

    let names = store.view(|tx| Ok(tx.buckets().count())).unwrap();
    assert_eq!(names, 0);
    assert_eq!(store.mode(), OpenMode::ReadOnly);
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}

#[test]
fn test_open_foreign_file() {
    let (_temp, path) = setup_store_file();
    fs::write(&path, b"this is not a store file").unwrap();

    let err = Store::open(&path, OpenMode::ReadOnly).err().unwrap();

    assert!(matches!(err, MonkeyError::StoreCorrupted(_)));
}

// =============================================================================
// Read/Write Tests
// =============================================================================

#[test]
fn test_update_then_view() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    assert_eq!(leaf(&store, &[b"animals"], b"cat"), Some(b"meow".to_vec()));
    assert_eq!(leaf(&store, &[b"animals", b"birds"], b"owl"), Some(b"hoot".to_vec()));
    assert_eq!(leaf(&store, &[b"animals"], b"birds"), None);
    assert_eq!(leaf(&store, &[b"plants"], b"fern"), None);
}

#[test]
fn test_entries_in_key_order() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    let listed = store
        .view(|tx| {
            let animals = tx.bucket(b"animals").unwrap();
            Ok(animals
                .entries()
                .map(|entry| (String::from_utf8_lossy(entry.key()).into_owned(), entry.is_leaf()))
                .collect::<Vec<_>>())
        })
        .unwrap();

    assert_eq!(
        listed,
        vec![
            ("birds".to_string(), false),
            ("cat".to_string(), true),
            ("dog".to_string(), true),
        ]
    );
}

#[test]
fn test_top_level_buckets_only() {
    let (_temp, store) = setup_temp_store();
    populate(&store);
    store
        .update(|tx| {
            tx.create_bucket_if_not_exists(b"zoo")?;
            tx.create_bucket_if_not_exists(b"aviary")?;
            Ok(())
        })
        .unwrap();

    let names = store
        .view(|tx| Ok(tx.buckets().map(<[u8]>::to_vec).collect::<Vec<_>>()))
        .unwrap();

    assert_eq!(names, vec![b"animals".to_vec(), b"aviary".to_vec(), b"zoo".to_vec()]);
}

#[test]
fn test_overwrite_value() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    store
        .update(|tx| tx.bucket_mut(b"animals").unwrap().put(b"cat", b"purr"))
        .unwrap();

    assert_eq!(leaf(&store, &[b"animals"], b"cat"), Some(b"purr".to_vec()));
}

#[test]
fn test_delete_and_absent_delete() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    store
        .update(|tx| {
            let mut animals = tx.bucket_mut(b"animals").unwrap();
            animals.delete(b"dog")?;
            animals.delete(b"dog")?;
            animals.delete(b"unicorn")
        })
        .unwrap();

    assert_eq!(leaf(&store, &[b"animals"], b"dog"), None);
    assert_eq!(leaf(&store, &[b"animals"], b"cat"), Some(b"meow".to_vec()));
}

#[test]
fn test_write_tx_sees_own_changes() {
    let (_temp, store) = setup_temp_store();

    store
        .update(|tx| {
            let mut b = tx.create_bucket_if_not_exists(b"b")?;
            b.put(b"k", b"v")?;
            assert_eq!(b.get(b"k"), Some(&b"v"[..]));
            assert_eq!(tx.buckets(), vec![b"b".to_vec()]);
            assert_eq!(tx.operations().len(), 2);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_failed_update_rolls_back() {
    let (_temp, path) = setup_store_file();
    let store = Store::open(&path, OpenMode::ReadWrite).unwrap();
    populate(&store);
    let len_before = fs::metadata(&path).unwrap().len();

    let result: monkey::Result<()> = store.update(|tx| {
        tx.bucket_mut(b"animals").unwrap().put(b"cat", b"changed")?;
        Err(MonkeyError::KeyNotFound("abort".to_string()))
    });

    assert!(result.is_err());
    assert_eq!(leaf(&store, &[b"animals"], b"cat"), Some(b"meow".to_vec()));
    assert_eq!(fs::metadata(&path).unwrap().len(), len_before);
}

// =============================================================================
// Exclusivity Tests
// =============================================================================

#[test]
fn test_put_onto_bucket_rejected() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    let err = store
        .update(|tx| tx.bucket_mut(b"animals").unwrap().put(b"birds", b"x"))
        .unwrap_err();

    assert!(matches!(err, MonkeyError::IncompatibleValue(_)));
}

#[test]
fn test_bucket_onto_leaf_rejected() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    let err = store
        .update(|tx| {
            let mut animals = tx.bucket_mut(b"animals").unwrap();
            animals.create_bucket_if_not_exists(b"cat")?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, MonkeyError::IncompatibleValue(_)));
}

#[test]
fn test_delete_bucket_rejected() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    let err = store
        .update(|tx| tx.bucket_mut(b"animals").unwrap().delete(b"birds"))
        .unwrap_err();

    assert!(matches!(err, MonkeyError::IncompatibleValue(_)));
}

#[test]
fn test_empty_key_rejected() {
    let (_temp, store) = setup_temp_store();

    let err = store
        .update(|tx| tx.create_bucket_if_not_exists(b"b")?.put(b"", b"v"))
        .unwrap_err();
    assert!(matches!(err, MonkeyError::EmptyKey));

    let err = store
        .update(|tx| tx.create_bucket_if_not_exists(b"").map(|_| ()))
        .unwrap_err();
    assert!(matches!(err, MonkeyError::EmptyKey));
}

#[test]
fn test_delete_bucket_removes_subtree() {
    let (_temp, path) = setup_store_file();
    {
        let store = Store::open(&path, OpenMode::ReadWrite).unwrap();
        populate(&store);
        store
            .update(|tx| tx.bucket_mut(b"animals").unwrap().delete_bucket(b"birds"))
            .unwrap();
        store.update(|tx| tx.create_bucket_if_not_exists(b"plants").map(|_| ())).unwrap();
        store.update(|tx| tx.delete_bucket(b"plants")).unwrap();
        store.close().unwrap();
    }

    let store = Store::open(&path, OpenMode::ReadOnly).unwrap();
    let names = store
        .view(|tx| Ok(tx.buckets().map(<[u8]>::to_vec).collect::<Vec<_>>()))
        .unwrap();
    assert_eq!(names, vec![b"animals".to_vec()]);
    assert_eq!(leaf(&store, &[b"animals", b"birds"], b"owl"), None);
    assert_eq!(leaf(&store, &[b"animals"], b"cat"), Some(b"meow".to_vec()));
}

#[test]
fn test_delete_bucket_on_leaf_rejected() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    let err = store
        .update(|tx| tx.bucket_mut(b"animals").unwrap().delete_bucket(b"cat"))
        .unwrap_err();

    assert!(matches!(err, MonkeyError::IncompatibleValue(_)));
    assert_eq!(leaf(&store, &[b"animals"], b"cat"), Some(b"meow".to_vec()));
}

#[test]
fn test_delete_absent_bucket_is_noop() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    store.update(|tx| tx.delete_bucket(b"nothing")).unwrap();
    let ops = store
        .update(|tx| {
            tx.delete_bucket(b"nothing")?;
            Ok(tx.operations().len())
        })
        .unwrap();

    assert_eq!(ops, 0);
    assert!(leaf(&store, &[b"animals"], b"dog").is_some());
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reopen_preserves_data() {
    let (_temp, path) = setup_store_file();
    {
        let store = Store::open(&path, OpenMode::ReadWrite).unwrap();
        populate(&store);
        store
            .update(|tx| tx.bucket_mut(b"animals").unwrap().delete(b"dog"))
            .unwrap();
        store.close().unwrap();
    }

    let store = Store::open(&path, OpenMode::ReadOnly).unwrap();

    assert_eq!(leaf(&store, &[b"animals"], b"cat"), Some(b"meow".to_vec()));
    assert_eq!(leaf(&store, &[b"animals"], b"dog"), None);
    assert_eq!(leaf(&store, &[b"animals", b"birds"], b"owl"), Some(b"hoot".to_vec()));
}

#[test]
fn test_batch_persists_after_close() {
    let (_temp, path) = setup_store_file();
    let config = StoreConfig {
        sync_strategy: LogSyncStrategy::EveryNEntries { count: 1000 },
    };
    {
        let store = Store::open_with(&path, OpenMode::ReadWrite, config).unwrap();
        for i in 0..20 {
            store
                .batch(|tx| {
                    tx.create_bucket_if_not_exists(b"b")?
                        .put(format!("k{}", i).as_bytes(), b"v")
                })
                .unwrap();
        }
        store.close().unwrap();
    }

    let store = Store::open(&path, OpenMode::ReadOnly).unwrap();
    let count = store.view(|tx| Ok(tx.bucket(b"b").unwrap().len())).unwrap();
    assert_eq!(count, 20);
}

#[test]
fn test_read_only_rejects_writes() {
    let (_temp, path) = setup_store_file();

    let store = Store::open(&path, OpenMode::ReadOnly).unwrap();
    let err = store
        .update(|tx| tx.create_bucket_if_not_exists(b"b").map(|_| ()))
        .unwrap_err();

    assert!(matches!(err, MonkeyError::ReadOnly));
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}

#[test]
fn test_damaged_tail_recovery() {
    let (_temp, path) = setup_store_file();
    {
        let store = Store::open(&path, OpenMode::ReadWrite).unwrap();
        populate(&store);
        store.close().unwrap();
    }
    let clean_len = fs::metadata(&path).unwrap().len();
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0u8; 7]).unwrap();
    drop(file);

    // Read-only opens leave the file alone
    let store = Store::open(&path, OpenMode::ReadOnly).unwrap();
    assert_eq!(leaf(&store, &[b"animals"], b"dog"), Some(b"woof".to_vec()));
    assert_eq!(fs::metadata(&path).unwrap().len(), clean_len + 7);
    drop(store);

    let store = Store::open(&path, OpenMode::ReadWrite).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), clean_len);
    store
        .update(|tx| tx.bucket_mut(b"animals").unwrap().put(b"cow", b"moo"))
        .unwrap();
    store.close().unwrap();

    let store = Store::open(&path, OpenMode::ReadOnly).unwrap();
    assert_eq!(leaf(&store, &[b"animals"], b"cow"), Some(b"moo".to_vec()));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_view_is_a_snapshot() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    store
        .view(|tx| {
            store.update(|w| w.bucket_mut(b"animals").unwrap().put(b"cat", b"hiss"))?;
            let animals = tx.bucket(b"animals").unwrap();
            assert_eq!(animals.get(b"cat"), Some(&b"meow"[..]));
            Ok(())
        })
        .unwrap();

    assert_eq!(leaf(&store, &[b"animals"], b"cat"), Some(b"hiss".to_vec()));
}

#[test]
fn test_concurrent_readers_and_writer() {
    let (_temp, store) = setup_temp_store();
    store
        .update(|tx| tx.create_bucket_if_not_exists(b"counter").map(|_| ()))
        .unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..50u32 {
                store
                    .update(|tx| {
                        let mut b = tx.bucket_mut(b"counter").unwrap();
                        b.put(format!("k{:03}", i).as_bytes(), &i.to_le_bytes())
                    })
                    .unwrap();
            }
        });

        for _ in 0..4 {
            s.spawn(|| {
                let mut last = 0;
                for _ in 0..200 {
                    let seen = store
                        .view(|tx| Ok(tx.bucket(b"counter").unwrap().len()))
                        .unwrap();
                    assert!(seen >= last);
                    last = seen;
                }
            });
        }
    });

    let total = store.view(|tx| Ok(tx.bucket(b"counter").unwrap().len())).unwrap();
    assert_eq!(total, 50);
}

#[test]
fn test_entry_variants() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    store
        .view(|tx| {
            let animals = tx.bucket(b"animals").unwrap();
            for entry in animals.entries() {
                match entry {
                    Entry::Leaf { key, value } => {
                        assert_eq!(animals.get(key), Some(value));
                    }
                    Entry::Bucket { key, bucket } => {
                        assert_eq!(key, b"birds");
                        assert_eq!(bucket.len(), 1);
                    }
                }
            }
            Ok(())
        })
        .unwrap();
}

// =============================================================================
// Locking Tests
// =============================================================================

#[test]
fn test_second_writer_locked_out() {
    let (_temp, path) = setup_store_file();
    let first = Store::open(&path, OpenMode::ReadWrite).unwrap();

    let err = Store::open(&path, OpenMode::ReadWrite).unwrap_err();
    assert!(matches!(err, MonkeyError::StoreLocked(_)));

    let err = Store::open(&path, OpenMode::ReadOnly).unwrap_err();
    assert!(matches!(err, MonkeyError::StoreLocked(_)));

    first.close().unwrap();
    assert!(Store::open(&path, OpenMode::ReadWrite).is_ok());
}

#[test]
fn test_readers_share_but_block_writer() {
    let (_temp, path) = setup_store_file();
    {
        let store = Store::open(&path, OpenMode::ReadWrite).unwrap();
        populate(&store);
        store.close().unwrap();
    }

    let first = Store::open(&path, OpenMode::ReadOnly).unwrap();
    let second = Store::open(&path, OpenMode::ReadOnly).unwrap();
    assert_eq!(leaf(&second, &[b"animals"], b"cat"), Some(b"meow".to_vec()));

    let err = Store::open(&path, OpenMode::ReadWrite).unwrap_err();
    assert!(matches!(err, MonkeyError::StoreLocked(_)));

    drop(first);
    drop(second);
    assert!(Store::open(&path, OpenMode::ReadWrite).is_ok());
}

#[test]
fn test_writes_from_successive_writers_all_survive() {
    let (_temp, path) = setup_store_file();

    let first = Store::open(&path, OpenMode::ReadWrite).unwrap();
    first
        .update(|tx| tx.create_bucket_if_not_exists(b"b")?.put(b"a", b"1"))
        .unwrap();
    assert!(Store::open(&path, OpenMode::ReadWrite).is_err());
    first.close().unwrap();

    let second = Store::open(&path, OpenMode::ReadWrite).unwrap();
    second
        .update(|tx| tx.create_bucket_if_not_exists(b"b")?.put(b"b", b"2"))
        .unwrap();
    second.close().unwrap();

    let store = Store::open(&path, OpenMode::ReadOnly).unwrap();
    assert_eq!(leaf(&store, &[b"b"], b"a"), Some(b"1".to_vec()));
    assert_eq!(leaf(&store, &[b"b"], b"b"), Some(b"2".to_vec()));
}
