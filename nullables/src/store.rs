//! Nullable store: thread-safe in-memory backend for testing.

use std::collections::BTreeMap;
use std::sync::RwLock;
use tradefin_store::{BatchOp, KvStore, StoreError, Table, WriteBatch};

/// An in-memory [`KvStore`]. The table is part of every map key, so table
/// key spaces stay disjoint exactly as they do in LMDB.
pub struct NullStore {
    entries: RwLock<BTreeMap<(Table, Vec<u8>), Vec<u8>>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of entries stored in `table`.
    pub fn len(&self, table: Table) -> usize {
        self.entries
            .read()
            .map(|map| map.keys().filter(|(t, _)| *t == table).count())
            .unwrap_or(0)
    }

    /// Total number of entries across all tables.
    pub fn total_len(&self) -> usize {
        self.entries.read().map(|map| map.len()).unwrap_or(0)
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E>(_: E) -> StoreError {
    StoreError::Backend("null store lock poisoned".into())
}

impl KvStore for NullStore {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let map = self.entries.read().map_err(poisoned)?;
        Ok(map.get(&(table, key.to_vec())).cloned())
    }

    fn scan_prefix(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let map = self.entries.read().map_err(poisoned)?;
        Ok(map
            .range((table, prefix.to_vec())..)
            .take_while(|((t, k), _)| *t == table && k.starts_with(prefix))
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect())
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut map = self.entries.write().map_err(poisoned)?;
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { table, key, value } => {
                    map.insert((table, key), value);
                }
                BatchOp::Delete { table, key } => {
                    map.remove(&(table, key));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_disjoint() {
        let store = NullStore::new();
        let mut batch = WriteBatch::new();
        batch.put(Table::Escrows, b"1".to_vec(), vec![1]);
        batch.put(Table::Invoices, b"1".to_vec(), vec![2]);
        store.apply(batch).unwrap();

        assert_eq!(store.get(Table::Escrows, b"1").unwrap(), Some(vec![1]));
        assert_eq!(store.get(Table::Invoices, b"1").unwrap(), Some(vec![2]));
        assert_eq!(store.len(Table::Escrows), 1);
        assert_eq!(store.total_len(), 2);
    }

    #[test]
    fn prefix_scan_stays_inside_table() {
        let store = NullStore::new();
        let mut batch = WriteBatch::new();
        batch.put(Table::Stakes, b"aa1".to_vec(), vec![1]);
        batch.put(Table::Stakes, b"aa2".to_vec(), vec![2]);
        batch.put(Table::Stakes, b"ab1".to_vec(), vec![3]);
        batch.put(Table::StakePools, b"aa9".to_vec(), vec![4]);
        store.apply(batch).unwrap();

        let hits = store.scan_prefix(Table::Stakes, b"aa").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].1, vec![2]);
    }

    #[test]
    fn delete_removes_entry() {
        let store = NullStore::new();
        let mut batch = WriteBatch::new();
        batch.put(Table::Meta, b"v".to_vec(), vec![1]);
        store.apply(batch).unwrap();

        let mut batch = WriteBatch::new();
        batch.delete(Table::Meta, b"v".to_vec());
        store.apply(batch).unwrap();
        assert_eq!(store.get(Table::Meta, b"v").unwrap(), None);
    }
}
