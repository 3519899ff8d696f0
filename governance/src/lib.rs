//! Stake-weighted governance.
//!
//! Proposals are voted on with lock-weighted stake power and pass on a
//! simple majority subject to quorum against the power snapshot taken at
//! creation. Passed proposals may require execution approval from several
//! financiers. Trade-finance requests are voted on by financiers only.

pub mod engine;
pub mod error;
pub mod params;
pub mod proposal;
pub mod request;
pub mod store;

pub use engine::GovernanceEngine;
pub use error::GovernanceError;
pub use params::GovernanceParams;
pub use proposal::{Ballot, ExecutionApproval, Proposal, ProposalCategory, ProposalStatus};
pub use request::{RequestStatus, TradeFinanceRequest};
pub use store::GovernanceStore;
