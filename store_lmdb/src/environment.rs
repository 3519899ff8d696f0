//! LMDB environment setup and the [`KvStore`] implementation.

use std::collections::HashMap;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tradefin_store::{BatchOp, KvStore, StoreError, Table, WriteBatch};

use crate::LmdbError;

/// Version of the on-disk layout, written to the meta table on first open.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_KEY: &[u8] = b"schema_version";

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Wraps the LMDB environment and one database handle per table.
pub struct LmdbStore {
    env: Arc<Env>,
    databases: HashMap<Table, Database<Bytes, Bytes>>,
}

impl LmdbStore {
    /// Open or create an LMDB environment at the given path, creating every
    /// table database that does not exist yet.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per path by this process and
        // never memory-mapped elsewhere while the store is alive.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(Table::ALL.len() as u32)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let mut databases = HashMap::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            let db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(table.name()))?;
            databases.insert(table, db);
        }
        let meta = databases
            .get(&Table::Meta)
            .copied()
            .ok_or(LmdbError::MissingDatabase(Table::Meta.name()))?;
        if meta.get(&wtxn, SCHEMA_KEY)?.is_none() {
            meta.put(&mut wtxn, SCHEMA_KEY, &SCHEMA_VERSION.to_be_bytes())?;
        }
        wtxn.commit()?;

        tracing::info!(path = %path.display(), tables = databases.len(), "opened LMDB store");
        Ok(Self {
            env: Arc::new(env),
            databases,
        })
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    /// Schema version recorded in the meta table.
    pub fn schema_version(&self) -> Result<Option<u32>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let version = self.db(Table::Meta)?.get(&rtxn, SCHEMA_KEY)?.and_then(|bytes| {
            let raw: [u8; 4] = bytes.try_into().ok()?;
            Some(u32::from_be_bytes(raw))
        });
        Ok(version)
    }

    /// Number of entries in `table`.
    pub fn count(&self, table: Table) -> Result<u64, LmdbError> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db(table)?.len(&rtxn)?)
    }

    fn db(&self, table: Table) -> Result<Database<Bytes, Bytes>, LmdbError> {
        self.databases
            .get(&table)
            .copied()
            .ok_or(LmdbError::MissingDatabase(table.name()))
    }
}

/// The smallest key greater than every key starting with `prefix`, or `None`
/// when no such key exists (empty or all-0xFF prefix).
pub(crate) fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

impl KvStore for LmdbStore {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let db = self.db(table)?;
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = db.get(&rtxn, key).map_err(LmdbError::from)?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn scan_prefix(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let db = self.db(table)?;
        let upper = prefix_upper_bound(prefix);
        let bounds = (
            Bound::Included(prefix),
            match upper.as_deref() {
                Some(upper) => Bound::Excluded(upper),
                None => Bound::Unbounded,
            },
        );

        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = db.range(&rtxn, &bounds).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for result in iter {
            let (key, value) = result.map_err(LmdbError::from)?;
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }

    fn apply(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let ops = batch.len();
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { table, key, value } => {
                    self.db(table)?
                        .put(&mut wtxn, &key, &value)
                        .map_err(LmdbError::from)?;
                }
                BatchOp::Delete { table, key } => {
                    self.db(table)?
                        .delete(&mut wtxn, &key)
                        .map_err(LmdbError::from)?;
                }
            }
        }
        wtxn.commit().map_err(LmdbError::from)?;
        tracing::trace!(ops, "committed write batch");
        Ok(())
    }
}
