//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator of the ledger core (storage backend, clock, price feed,
//! token custody) is abstracted behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod bank;
pub mod clock;
pub mod oracle;
pub mod store;

pub use bank::NullBank;
pub use clock::NullClock;
pub use oracle::NullOracle;
pub use store::NullStore;
