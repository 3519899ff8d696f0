//! Transactional overlay over a [`KvStore`].

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::kv::{KvStore, WriteBatch};
use crate::table::Table;

/// The working set of one ledger operation.
///
/// Reads fall through to the backend unless the key was written earlier in
/// the same transaction, so an operation always sees its own writes. Nothing
/// reaches the backend until [`StoreTxn::commit`]; dropping the transaction
/// discards every staged write, which is how failed operations roll back.
pub struct StoreTxn<'a> {
    base: &'a dyn KvStore,
    /// `None` marks a staged delete.
    staged: BTreeMap<(Table, Vec<u8>), Option<Vec<u8>>>,
}

impl<'a> StoreTxn<'a> {
    pub fn begin(base: &'a dyn KvStore) -> Self {
        Self {
            base,
            staged: BTreeMap::new(),
        }
    }

    pub fn get_raw(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.staged.get(&(table, key.to_vec())) {
            Some(staged) => Ok(staged.clone()),
            None => self.base.get(table, key),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, table: Table, key: &[u8]) -> Result<Option<T>, StoreError> {
        match self.get_raw(table, key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, table: Table, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get_raw(table, key)?.is_some())
    }

    pub fn put<T: Serialize>(&mut self, table: Table, key: Vec<u8>, value: &T) -> Result<(), StoreError> {
        let bytes = bincode::serialize(value)?;
        self.staged.insert((table, key), Some(bytes));
        Ok(())
    }

    pub fn delete(&mut self, table: Table, key: Vec<u8>) {
        self.staged.insert((table, key), None);
    }

    /// Entries of `table` whose key starts with `prefix`, merged with the
    /// staged writes, in key order.
    pub fn scan<T: DeserializeOwned>(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, T)>, StoreError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.base.scan_prefix(table, prefix)?.into_iter().collect();
        let start = (table, prefix.to_vec());
        for ((t, key), value) in self.staged.range(start..) {
            if *t != table || !key.starts_with(prefix) {
                break;
            }
            match value {
                Some(bytes) => {
                    merged.insert(key.clone(), bytes.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged
            .into_iter()
            .map(|(k, v)| Ok((k, bincode::deserialize(&v)?)))
            .collect()
    }

    /// Allocate the next value of a named sequential counter. Counters start
    /// at 1, so 0 never identifies an entity.
    pub fn next_id(&mut self, counter: &str) -> Result<u64, StoreError> {
        let key = counter.as_bytes().to_vec();
        let current: u64 = self.get(Table::Counters, &key)?.unwrap_or(0);
        let next = current
            .checked_add(1)
            .ok_or_else(|| StoreError::Corruption(format!("counter {counter} overflowed")))?;
        self.put(Table::Counters, key, &next)?;
        Ok(next)
    }

    /// Number of staged mutations.
    pub fn pending_writes(&self) -> usize {
        self.staged.len()
    }

    pub fn into_batch(self) -> WriteBatch {
        let mut batch = WriteBatch::new();
        for ((table, key), value) in self.staged {
            match value {
                Some(v) => batch.put(table, key, v),
                None => batch.delete(table, key),
            }
        }
        batch
    }

    /// Apply every staged write atomically.
    pub fn commit(self) -> Result<(), StoreError> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let base = self.base;
        base.apply(self.into_batch())
    }
}
