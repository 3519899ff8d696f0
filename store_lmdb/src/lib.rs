//! LMDB storage backend for the trade-finance ledger.
//!
//! Implements [`tradefin_store::KvStore`] using the `heed` LMDB bindings.
//! Each logical [`tradefin_store::Table`] maps to its own named database
//! within a single environment, and every write batch is applied in one LMDB
//! write transaction.

pub mod environment;
pub mod error;
pub mod integrity;

pub use environment::LmdbStore;
pub use error::LmdbError;
pub use integrity::{check_integrity, IntegrityReport};
