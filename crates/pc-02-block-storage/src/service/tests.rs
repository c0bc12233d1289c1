//! # File Block Store Tests

use super::*;
use crate::adapters::fault::{Fault, FaultyFileSystem};
use shared_types::BlockType;
use tempfile::TempDir;

fn make_block(number: u64, previous_hash: Vec<u8>) -> Block {
    let block_type = if number == 0 {
        BlockType::Config
    } else {
        BlockType::Normal
    };
    let mut block = Block::new(
        number,
        previous_hash,
        block_type,
        vec![format!("tx-{}", number).into_bytes()],
    );
    block.seal_hash();
    block
}

/// Blocks 0..n, hash-linked.
fn make_chain(n: u64) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for i in 0..n {
        let prev = blocks.last().map(|b| b.header.hash.clone()).unwrap_or_default();
        blocks.push(make_block(i, prev));
    }
    blocks
}

fn faulty_store(dir: &TempDir) -> (FileBlockStore, Arc<FaultyFileSystem>) {
    let fs = Arc::new(FaultyFileSystem::new(Fault::None));
    let deps = StorageDependencies {
        fs: fs.clone(),
        ..StorageDependencies::default()
    };
    (FileBlockStore::open_with(dir.path(), deps).unwrap(), fs)
}

#[test]
fn test_store_and_read_blocks() {
    let dir = TempDir::new().unwrap();
    let store = FileBlockStore::open(dir.path()).unwrap();
    let chain = make_chain(3);
    for block in &chain {
        store.store_block("mychannel", block).unwrap();
    }

    assert_eq!(store.height("mychannel").unwrap(), 3);
    assert_eq!(store.last_block_hash("mychannel").unwrap(), chain[2].header.hash);
    assert_eq!(store.get_block("mychannel", 1).unwrap(), chain[1]);
    assert_eq!(store.get_block_range("mychannel", 0, 3).unwrap(), chain);
    assert_eq!(store.channels(), vec!["mychannel".to_string()]);
    assert!(dir.path().join("mychannel").join(block_file_name(2)).exists());
}

#[test]
fn test_missing_blocks_are_not_found() {
    let dir = TempDir::new().unwrap();
    let store = FileBlockStore::open(dir.path()).unwrap();
    store.store_block("c1", &make_block(0, vec![])).unwrap();

    assert!(matches!(
        store.get_block("c1", 1),
        Err(StorageError::NotFound { number: 1, .. })
    ));
    assert!(matches!(
        store.get_block_range("c1", 0, 2),
        Err(StorageError::NotFound { number: 1, .. })
    ));
    assert!(store.get_block_range("c1", 1, 1).unwrap().is_empty());
    assert!(matches!(
        store.get_block_range("c1", 2, 1),
        Err(StorageError::InvalidRange { .. })
    ));
    assert!(matches!(
        store.height("nope"),
        Err(StorageError::ChannelNotFound { .. })
    ));
}

#[test]
fn test_sequential_append_enforced() {
    let dir = TempDir::new().unwrap();
    let store = FileBlockStore::open(dir.path()).unwrap();
    let chain = make_chain(3);
    store.store_block("c1", &chain[0]).unwrap();

    assert!(matches!(
        store.store_block("c1", &chain[2]),
        Err(StorageError::NonSequential { expected: 1, got: 2, .. })
    ));
    assert!(matches!(
        store.store_block("c1", &chain[0]),
        Err(StorageError::BlockExists { number: 0, .. })
    ));

    let unlinked = make_block(1, vec![9u8; 32]);
    let err = store.store_block("c1", &unlinked).unwrap_err();
    assert!(matches!(err, StorageError::PreviousHashMismatch { .. }));
    assert_eq!(err.status_code(), shared_types::StatusCode::InvalidBlock);

    let mut tampered = chain[1].clone();
    tampered.data.transactions[0] = b"evil".to_vec();
    assert!(matches!(
        store.store_block("c1", &tampered),
        Err(StorageError::HashMismatch { .. })
    ));

    assert!(matches!(
        store.store_block("Bad/Name", &chain[0]),
        Err(StorageError::InvalidChannelId { .. })
    ));
    assert_eq!(store.height("c1").unwrap(), 1);
}

#[test]
fn test_mark_committed_persists() {
    let dir = TempDir::new().unwrap();
    {
        let store = FileBlockStore::open(dir.path()).unwrap();
        let chain = make_chain(2);
        store.store_block("c1", &chain[0]).unwrap();
        store.store_block("c1", &chain[1]).unwrap();
        assert!(!store.is_committed("c1", 0).unwrap());
        store.mark_committed("c1", 0).unwrap();
        store.mark_committed("c1", 0).unwrap();
        assert!(store.is_committed("c1", 0).unwrap());
        assert!(store.get_record("c1", 0).unwrap().committed);
        assert!(matches!(
            store.mark_committed("c1", 5),
            Err(StorageError::NotFound { .. })
        ));
    }

    let reopened = FileBlockStore::open(dir.path()).unwrap();
    assert!(reopened.is_committed("c1", 0).unwrap());
    assert!(!reopened.is_committed("c1", 1).unwrap());
}

#[test]
fn test_recovery_rebuilds_state() {
    let dir = TempDir::new().unwrap();
    let chain = make_chain(4);
    {
        let store = FileBlockStore::open(dir.path()).unwrap();
        for block in &chain {
            store.store_block("alpha", block).unwrap();
        }
        store.store_block("beta", &chain[0]).unwrap();
    }

    let store = FileBlockStore::open(dir.path()).unwrap();
    assert_eq!(store.height("alpha").unwrap(), 4);
    assert_eq!(store.last_block_hash("alpha").unwrap(), chain[3].header.hash);
    assert_eq!(store.height("beta").unwrap(), 1);
    assert_eq!(store.channels(), vec!["alpha".to_string(), "beta".to_string()]);

    // Appending continues where the previous process stopped.
    let next = make_block(4, chain[3].header.hash.clone());
    store.store_block("alpha", &next).unwrap();
}

#[test]
fn test_recovery_skips_corrupt_block() {
    let dir = TempDir::new().unwrap();
    let chain = make_chain(3);
    {
        let store = FileBlockStore::open(dir.path()).unwrap();
        for block in &chain {
            store.store_block("c1", block).unwrap();
        }
    }
    let victim = dir.path().join("c1").join(block_file_name(1));
    let mut bytes = std::fs::read(&victim).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&victim, bytes).unwrap();

    let store = FileBlockStore::open(dir.path()).unwrap();
    assert_eq!(store.height("c1").unwrap(), 1);
    assert_eq!(store.last_block_hash("c1").unwrap(), chain[0].header.hash);
    // The damaged slot can be rewritten.
    store.store_block("c1", &chain[1]).unwrap();
    assert_eq!(store.get_block("c1", 1).unwrap(), chain[1]);
}

#[test]
fn test_failed_rename_leaves_no_trace() {
    let dir = TempDir::new().unwrap();
    let (store, fs) = faulty_store(&dir);
    let chain = make_chain(2);
    store.store_block("c1", &chain[0]).unwrap();

    fs.set_fault(Fault::FailRename);
    let err = store.store_block("c1", &chain[1]).unwrap_err();
    assert_eq!(err.status_code(), shared_types::StatusCode::StorageError);

    assert_eq!(store.height("c1").unwrap(), 1);
    assert_eq!(store.last_block_hash("c1").unwrap(), chain[0].header.hash);
    let names: Vec<_> = std::fs::read_dir(dir.path().join("c1"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![block_file_name(0)]);

    fs.set_fault(Fault::None);
    store.store_block("c1", &chain[1]).unwrap();
}

#[test]
fn test_crash_between_write_and_rename_recovers_exact_state() {
    for fault in [Fault::Crash, Fault::TornWrite] {
        let dir = TempDir::new().unwrap();
        let chain = make_chain(3);
        {
            let (store, fs) = faulty_store(&dir);
            store.store_block("c1", &chain[0]).unwrap();
            store.store_block("c1", &chain[1]).unwrap();
            fs.set_fault(fault);
            assert!(store.store_block("c1", &chain[2]).is_err());
        }

        let tmp = dir
            .path()
            .join("c1")
            .join(format!("{}{}", block_file_name(2), TEMP_SUFFIX));
        assert!(tmp.exists(), "{:?} should leave its temp file", fault);
        assert!(!dir.path().join("c1").join(block_file_name(2)).exists());

        let store = FileBlockStore::open(dir.path()).unwrap();
        assert!(!tmp.exists());
        assert_eq!(store.height("c1").unwrap(), 2);
        assert_eq!(store.last_block_hash("c1").unwrap(), chain[1].header.hash);
        store.store_block("c1", &chain[2]).unwrap();
    }
}

#[test]
fn test_concurrent_readers_see_prefix() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileBlockStore::open(dir.path()).unwrap());
    let chain = make_chain(20);
    store.store_block("c1", &chain[0]).unwrap();

    let reader = {
        let store = store.clone();
        std::thread::spawn(move || {
            for _ in 0..200 {
                let h = store.height("c1").unwrap();
                // Every block below the observed height is readable.
                store.get_block("c1", h - 1).unwrap();
            }
        })
    };
    for block in &chain[1..] {
        store.store_block("c1", block).unwrap();
    }
    reader.join().unwrap();
    assert_eq!(store.height("c1").unwrap(), 20);
}

#[test]
fn test_failed_directory_sync_keeps_visible_block() {
    let dir = TempDir::new().unwrap();
    let chain = make_chain(2);
    {
        let (store, fs) = faulty_store(&dir);
        store.store_block("c1", &chain[0]).unwrap();
        fs.set_fault(Fault::FailSyncDir);
        store.store_block("c1", &chain[1]).unwrap();
        store.mark_committed("c1", 1).unwrap();
        assert_eq!(store.height("c1").unwrap(), 2);
    }

    // Memory matched what recovery finds on disk.
    let store = FileBlockStore::open(dir.path()).unwrap();
    assert_eq!(store.height("c1").unwrap(), 2);
    assert!(store.is_committed("c1", 1).unwrap());
}

#[test]
fn test_failed_commit_mark_leaves_block_stored() {
    let dir = TempDir::new().unwrap();
    let chain = make_chain(1);
    {
        let (store, fs) = faulty_store(&dir);
        fs.set_fault(Fault::FailOverwrite);
        store.store_block("c1", &chain[0]).unwrap();
        assert!(store.mark_committed("c1", 0).is_err());
        assert_eq!(store.height("c1").unwrap(), 1);
        assert!(!store.is_committed("c1", 0).unwrap());

        fs.set_fault(Fault::None);
        store.mark_committed("c1", 0).unwrap();
    }

    let store = FileBlockStore::open(dir.path()).unwrap();
    assert!(store.is_committed("c1", 0).unwrap());
}
