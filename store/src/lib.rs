//! The shared keyed store every ledger component reads and writes.
//!
//! One store per deployment, addressed through a fixed set of [`Table`]s whose
//! key spaces are disjoint by construction. Backends (LMDB, in-memory for
//! testing) implement [`KvStore`]; components never talk to a backend
//! directly. Each ledger operation runs inside a [`StoreTxn`], an overlay that
//! buffers every write until the operation succeeds and is committed as one
//! atomic [`WriteBatch`].

pub mod error;
pub mod key;
pub mod kv;
pub mod table;
pub mod txn;

pub use error::StoreError;
pub use kv::{BatchOp, KvStore, WriteBatch};
pub use table::Table;
pub use txn::StoreTxn;
