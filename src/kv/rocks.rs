//! RocksDB backend for the disk-backed engines.

use super::{BatchOp, KvBackend};
use crate::error::{GraphError, Result};
use rocksdb::{Options, WriteBatch, DB};
use std::path::Path;

/// Durable key-value backend over RocksDB.
///
/// Used by the `embedded-transactional`, `document`, and
/// `batch-write-only` engines. Writes are WAL-protected; batches apply
/// atomically.
pub struct RocksDbBackend {
    db: DB,
}

impl RocksDbBackend {
    /// Open or create a database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path.as_ref()).map_err(|e| {
            GraphError::storage(
                format!("Failed to open RocksDB at {:?}", path.as_ref()),
                Some(e),
            )
        })?;

        Ok(Self { db })
    }
}

impl KvBackend for RocksDbBackend {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db
            .put(key, value)
            .map_err(|e| GraphError::storage("Failed to put key-value pair", Some(e)))
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| GraphError::storage("Failed to get value", Some(e)))
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| GraphError::storage("Failed to delete key", Some(e)))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut results = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) =
                item.map_err(|e| GraphError::storage("Failed to iterate over prefix", Some(e)))?;

            // The iterator may run past the prefix; stop explicitly.
            if !key.starts_with(prefix) {
                break;
            }

            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }

    fn write_batch(&mut self, ops: Vec<BatchOp>) -> Result<()> {
        let mut batch = WriteBatch::default();

        for op in ops {
            match op {
                BatchOp::Put { key, value } => batch.put(&key, &value),
                BatchOp::Delete { key } => batch.delete(&key),
            }
        }

        self.db
            .write(batch)
            .map_err(|e| GraphError::storage("Failed to write batch", Some(e)))
    }

    fn flush(&mut self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| GraphError::storage("Failed to flush database", Some(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (RocksDbBackend, TempDir) {
        let dir = TempDir::new().unwrap();
        let backend = RocksDbBackend::open(dir.path()).unwrap();
        (backend, dir)
    }

    #[test]
    fn test_put_and_get() {
        let (mut backend, _dir) = open_temp();
        backend.put(b"key1", b"value1").unwrap();
        assert_eq!(backend.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert!(backend.get(b"missing").unwrap().is_none());
    }

    #[test]
    fn test_scan_prefix() {
        let (mut backend, _dir) = open_temp();
        backend.put(b"vertex:1", b"a").unwrap();
        backend.put(b"vertex:2", b"b").unwrap();
        backend.put(b"edge:1", b"c").unwrap();

        let results = backend.scan_prefix(b"vertex:").unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(k, _)| k.starts_with(b"vertex:")));
    }

    #[test]
    fn test_write_batch_is_applied() {
        let (mut backend, _dir) = open_temp();
        backend.put(b"key1", b"value1").unwrap();

        backend
            .write_batch(vec![
                BatchOp::Delete {
                    key: b"key1".to_vec(),
                },
                BatchOp::Put {
                    key: b"key2".to_vec(),
                    value: b"value2".to_vec(),
                },
            ])
            .unwrap();

        assert!(backend.get(b"key1").unwrap().is_none());
        assert_eq!(backend.get(b"key2").unwrap(), Some(b"value2".to_vec()));
    }

    #[test]
    fn test_persistence_across_reopens() {
        let dir = TempDir::new().unwrap();

        {
            let mut backend = RocksDbBackend::open(dir.path()).unwrap();
            backend.put(b"persistent", b"data").unwrap();
            backend.flush().unwrap();
        }

        let backend = RocksDbBackend::open(dir.path()).unwrap();
        assert_eq!(backend.get(b"persistent").unwrap(), Some(b"data".to_vec()));
    }
}
