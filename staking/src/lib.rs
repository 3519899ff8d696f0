//! Stake ledger.
//!
//! Users lock tokens until a deadline. A stake earns rewards at a pool APR
//! that decays as the pool grows, and grants voting power weighted by the
//! remaining lock time. Stakes that are large and long enough carry
//! financier status, which gates trade-finance voting.

pub mod error;
pub mod ledger;
pub mod params;
pub mod rewards;
pub mod stake;
pub mod store;

pub use error::StakingError;
pub use ledger::StakeLedger;
pub use params::StakingParams;
pub use stake::{Stake, StakePool, StakeTotals, StakerAccount};
pub use store::StakeStore;
