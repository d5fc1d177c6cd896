//! Store backends through the public trait.

mod common;

use std::io::Write;

use objarchive::store::*;
use objarchive::Error;
use tempfile::NamedTempFile;

#[test]
fn test_memory_store_growth() {
    common::init_tracing();
    let mut store = MemoryStore::with_capacity(16);
    store.open_write().unwrap();

    let mut expected = Vec::new();
    let mut total = 0u64;
    for i in 0..200u32 {
        let chunk: Vec<u8> = (0..(i % 13) as u8 + 1).map(|b| b.wrapping_add(i as u8)).collect();
        store.write(&chunk).unwrap();
        expected.extend_from_slice(&chunk);
        total += chunk.len() as u64;
        assert!(store.length() >= store.size());
    }

    assert_eq!(store.size(), total);
    assert_eq!(store.bytes(), &expected[..]);
    assert!(store.length() > 16);
    store.close().unwrap();

    let bytes = Box::new(store).into_bytes().unwrap();
    assert_eq!(bytes, expected);
}

#[test]
fn test_null_store_counts() {
    let mut store = NullStore::new();
    store.open_write().unwrap();
    for n in [0usize, 1, 7, 4096, 3] {
        store.write(&vec![0xCC; n]).unwrap();
    }
    assert_eq!(store.bytes_written(), 4107);
    assert_eq!(store.tell(), 0);
    assert_eq!(store.length(), 0);
    assert!(store.read(&mut [0u8; 4]).is_ok());
    assert!(store.seek(100).is_ok());
    assert!(store.close().is_ok());
}

#[test]
fn test_read_only_stores_refuse_writes() {
    let file = NamedTempFile::new().unwrap();
    let mut fast = FastFileStore::new(file.path());
    assert!(matches!(fast.open_write(), Err(Error::ReadOnly)));

    let data = [1u8, 2, 3];
    let mut no_copy = MemoryNoCopyStore::new(&data);
    assert!(matches!(no_copy.open_write(), Err(Error::ReadOnly)));
    no_copy.open_read().unwrap();
    assert!(no_copy.write(&[9]).is_err());

    let mut empty = MemoryNoCopyStore::new(&[]);
    assert!(empty.open_read().is_err());
}

#[test]
fn test_missing_file_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.obj");

    let mut file = FileStore::new(&path);
    assert!(matches!(file.open_read(), Err(Error::FileNotFound(_))));
    assert!(!file.is_valid());

    let mut fast = FastFileStore::new(&path);
    assert!(matches!(fast.open_read(), Err(Error::FileNotFound(_))));
}

#[test]
fn test_file_backends_agree() {
    let mut temp = NamedTempFile::new().unwrap();
    let contents: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    temp.write_all(&contents).unwrap();
    temp.flush().unwrap();

    let mut stores: Vec<Box<dyn ArchiveStore>> = vec![
        Box::new(FileStore::new(temp.path())),
        Box::new(FastFileStore::new(temp.path())),
        Box::new(MemoryStore::from_bytes(&contents)),
    ];
    #[cfg(feature = "mmap")]
    stores.push(Box::new(MappedFileStore::new(temp.path())));

    for store in stores.iter_mut() {
        store.open_read().unwrap();
        assert_eq!(store.length(), 1000, "{}", store.name());

        store.seek(500).unwrap();
        let mut buf = [0u8; 4];
        store.read(&mut buf).unwrap();
        assert_eq!(&buf, &contents[500..504], "{}", store.name());
        assert_eq!(store.tell(), 504);

        assert!(store.seek(1001).is_err(), "{}", store.name());
        store.seek(998).unwrap();
        assert!(store.read(&mut buf).is_err(), "{}", store.name());
        store.close().unwrap();
    }
}
