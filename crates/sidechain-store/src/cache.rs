//! Staged state cache: a read/write set layered over committed state.
//!
//! A [`StateCache`] is one staging session (one block being assembled or
//! replayed). It owns its write set exclusively; reads fall through to the
//! underlying [`KvStore`] on a miss, and nothing reaches the store until
//! [`StateCache::commit`] issues one atomic batch.

use std::collections::HashMap;

use num_bigint::BigInt;
use sidechain_core::ProgramHash;

use crate::error::Result;
use crate::state::{key_to_str, DataEntryPrefix, StateValue};
use crate::traits::{KvStore, WriteBatch};

/// Balance reported by the placeholder account model.
pub const PLACEHOLDER_BALANCE: i64 = 100;

/// A staged entry in the write set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEntry {
    pub prefix: DataEntryPrefix,
    pub key: String,
    /// `None` only for tombstones.
    pub item: Option<StateValue>,
    pub is_deleted: bool,
}

/// Account hooks for smart-contract style state.
///
/// The base ledger has no account model; [`StateCache`] implements these
/// with fixed placeholder behavior so an account-based backend can replace
/// them.
pub trait AccountHooks {
    fn get_balance(&self, hash: &ProgramHash) -> BigInt;
    fn add_balance(&mut self, hash: &ProgramHash, amount: &BigInt);
    fn get_code_size(&self, hash: &ProgramHash) -> usize;
    /// Remove a contract. Returns whether the removal was staged.
    fn suicide(&mut self, code_hash: &ProgramHash) -> bool;
}

/// A single-writer staging session over `S`.
pub struct StateCache<'a, S: KvStore> {
    store: &'a S,
    write_set: HashMap<String, WriteEntry>,
}

impl<'a, S: KvStore> StateCache<'a, S> {
    /// Open a new session with an empty write set.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            write_set: HashMap::new(),
        }
    }

    /// Read the committed value, bypassing the write set.
    async fn try_get_internal(
        &self,
        prefix: DataEntryPrefix,
        key: &str,
    ) -> Result<Option<StateValue>> {
        match self.store.get(&prefix.store_key(key)).await? {
            Some(bytes) => Ok(Some(StateValue::decode(prefix, &bytes)?)),
            None => Ok(None),
        }
    }

    /// Staged value if present, else the committed value.
    ///
    /// `Ok(None)` means not found (or staged as deleted); the caller supplies
    /// a default.
    pub async fn get(&self, prefix: DataEntryPrefix, key: &str) -> Result<Option<StateValue>> {
        match self.write_set.get(key) {
            Some(entry) => Ok(entry.item.clone()),
            None => self.try_get_internal(prefix, key).await,
        }
    }

    /// As [`StateCache::get`], but stage `default` on a miss.
    ///
    /// A tombstoned entry is revived with `default`. A committed value found
    /// by read-through is staged as-is.
    pub async fn get_or_create(
        &mut self,
        prefix: DataEntryPrefix,
        key: &str,
        default: StateValue,
    ) -> Result<StateValue> {
        if let Some(entry) = self.write_set.get_mut(key) {
            if entry.is_deleted || entry.item.is_none() {
                entry.item = Some(default.clone());
                entry.is_deleted = false;
            }
            return Ok(entry.item.clone().unwrap_or(default));
        }

        let item = self
            .try_get_internal(prefix, key)
            .await?
            .unwrap_or(default);
        self.write_set.insert(
            key.to_string(),
            WriteEntry {
                prefix,
                key: key.to_string(),
                item: Some(item.clone()),
                is_deleted: false,
            },
        );
        Ok(item)
    }

    /// Stage a value, replacing whatever is staged for `key`.
    pub fn put(&mut self, prefix: DataEntryPrefix, key: &str, value: StateValue) {
        self.write_set.insert(
            key.to_string(),
            WriteEntry {
                prefix,
                key: key.to_string(),
                item: Some(value),
                is_deleted: false,
            },
        );
    }

    /// Tombstone `key`. An entry already staged keeps its own prefix;
    /// otherwise `prefix` names the namespace to delete from on commit.
    pub fn delete(&mut self, prefix: DataEntryPrefix, key: &str) {
        self.write_set
            .entry(key.to_string())
            .and_modify(|entry| {
                entry.item = None;
                entry.is_deleted = true;
            })
            .or_insert_with(|| WriteEntry {
                prefix,
                key: key.to_string(),
                item: None,
                is_deleted: true,
            });
    }

    /// The staged entries, for inspection or serialization.
    pub fn write_set(&self) -> &HashMap<String, WriteEntry> {
        &self.write_set
    }

    /// Flush every staged entry in one atomic batch and end the session.
    ///
    /// Returns the number of entries written.
    pub async fn commit(self) -> Result<usize> {
        let mut batch = WriteBatch::new();
        for entry in self.write_set.values() {
            let key = entry.prefix.store_key(&entry.key);
            match (&entry.item, entry.is_deleted) {
                (Some(item), false) => batch.batch_put(key, item.encode()),
                _ => batch.batch_delete(key),
            }
        }
        let count = batch.len();
        self.store.write_batch(batch).await?;
        tracing::debug!("state cache committed {} entries", count);
        Ok(count)
    }

    /// End the session without writing anything.
    pub fn discard(self) {
        tracing::debug!("state cache discarded {} entries", self.write_set.len());
    }
}

impl<S: KvStore> AccountHooks for StateCache<'_, S> {
    fn get_balance(&self, _hash: &ProgramHash) -> BigInt {
        BigInt::from(PLACEHOLDER_BALANCE)
    }

    fn add_balance(&mut self, _hash: &ProgramHash, _amount: &BigInt) {}

    fn get_code_size(&self, _hash: &ProgramHash) -> usize {
        0
    }

    fn suicide(&mut self, code_hash: &ProgramHash) -> bool {
        self.delete(DataEntryPrefix::Contract, &key_to_str(code_hash));
        true
    }
}
