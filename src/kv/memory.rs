//! Volatile in-memory backend.
//!
//! Backs the `in-memory` engine and the engines whose real stores live on
//! the other side of a network connection. All data is lost on drop.

use super::{BatchOp, KvBackend};
use crate::error::Result;
use std::collections::BTreeMap;

/// In-memory key-value backend over a `BTreeMap`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored key-value pairs. Useful in tests.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the backend holds no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvBackend for MemoryBackend {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write_batch(&mut self, ops: Vec<BatchOp>) -> Result<()> {
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // Nothing buffered
        Ok(())
    }
}
