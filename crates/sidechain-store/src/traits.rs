//! KvStore trait: the abstract interface for committed chain state.
//!
//! This trait keeps the state cache storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;

use crate::error::Result;

/// One operation of a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// A set of writes applied all-or-nothing by [`KvStore::write_batch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put.
    pub fn batch_put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Queue a delete.
    pub fn batch_delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete { key: key.into() });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// The KvStore trait: async interface over committed key/value state.
///
/// # Design Notes
///
/// - **Not found is not an error**: `get` returns `Ok(None)` for a missing key.
/// - **Atomic batches**: `write_batch` applies every operation or none; readers
///   never observe a partially applied batch.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a committed value.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Apply a batch atomically.
    async fn write_batch(&self, batch: WriteBatch) -> Result<()>;
}

/// Extension trait for common store patterns.
#[async_trait]
pub trait KvStoreExt: KvStore {
    /// Write a single key.
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.batch_put(key, value);
        self.write_batch(batch).await
    }

    /// Delete a single key.
    async fn delete(&self, key: &[u8]) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.batch_delete(key);
        self.write_batch(batch).await
    }

    /// Whether a key is present.
    async fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

impl<S: KvStore> KvStoreExt for S {}
