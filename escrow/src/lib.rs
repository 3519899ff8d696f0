//! Milestone escrow.
//!
//! An importer locks the full trade value, then releases it milestone by
//! milestone to the exporter. Either side may raise a dispute, which
//! freezes releases until the named arbitrator awards the remainder.
//! Principals may delegate individual permissions to sub-wallets.

pub mod engine;
pub mod error;
pub mod model;
pub mod params;
pub mod store;

pub use engine::EscrowEngine;
pub use error::EscrowError;
pub use model::{
    Dispute, DisputeStatus, Escrow, EscrowStatus, Milestone, MilestoneSpec, MilestoneStatus,
    NewEscrow, Permission, SubWallet, SubWalletRole,
};
pub use params::EscrowParams;
pub use store::EscrowStore;
