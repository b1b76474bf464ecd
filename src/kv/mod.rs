//! Low-level key-value storage shared by every engine backend.
//!
//! The [`KvBackend`] trait is the seam between the graph element store and
//! the physical medium. Two implementations exist:
//! - [`RocksDbBackend`]: durable on-disk storage for the embedded-style
//!   engines;
//! - [`MemoryBackend`]: volatile storage for the in-memory and
//!   remote-represented engines.

mod memory;
mod rocks;

pub use memory::MemoryBackend;
pub use rocks::RocksDbBackend;

use crate::error::Result;

/// A single write in an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Put a key-value pair
    Put {
        /// Key to write
        key: Vec<u8>,
        /// Value to write
        value: Vec<u8>,
    },
    /// Delete a key
    Delete {
        /// Key to delete
        key: Vec<u8>,
    },
}

/// Blocking key-value backend interface.
///
/// All operations return `Result`; implementations must make
/// [`write_batch`](KvBackend::write_batch) atomic (all writes land or
/// none do), since transaction commits rely on it.
pub trait KvBackend: Send {
    /// Store a key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Retrieve a value by key. `Ok(None)` when the key does not exist.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Delete a key-value pair. Idempotent: no error for a missing key.
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Collect all key-value pairs whose key starts with `prefix`,
    /// in ascending key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Apply a batch of writes atomically.
    fn write_batch(&mut self, ops: Vec<BatchOp>) -> Result<()>;

    /// Flush any buffered writes to the medium.
    fn flush(&mut self) -> Result<()>;
}
