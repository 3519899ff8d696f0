//! Governance proposals and their lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use tradefin_types::{Address, Amount, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalCategory {
    General,
    TradeFinance,
    Treasury,
    /// Change of a platform parameter.
    Parameter,
}

/// Active → Passed | Failed | Cancelled; Passed → Executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Active,
    Passed,
    Failed,
    Executed,
    Cancelled,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Address,
    pub category: ProposalCategory,
    pub title: String,
    pub description: String,
    pub votes_for: Amount,
    pub votes_against: Amount,
    pub created_at: Timestamp,
    pub voting_deadline: Timestamp,
    pub status: ProposalStatus,
    /// Set together with `status == Executed`; never cleared.
    pub executed: bool,
    pub executed_at: Option<Timestamp>,
    pub requires_multisig: bool,
    pub execution_approvals: u32,
    /// Total voting power when the proposal was opened.
    pub eligible_power: Amount,
}

/// A recorded vote. At most one per (proposal, voter).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub voter: Address,
    pub support: bool,
    pub power: Amount,
    pub cast_at: Timestamp,
}

/// At most one per (proposal, financier).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionApproval {
    pub financier: Address,
    pub approved_at: Timestamp,
}

/// Majority of the cast power, with `cast · 10000 ≥ quorum_bps · eligible`.
/// `None` on overflow.
pub fn tally_passes(
    votes_for: Amount,
    votes_against: Amount,
    eligible: Amount,
    quorum_bps: u32,
) -> Option<bool> {
    let cast = votes_for.checked_add(votes_against)?;
    let turnout = cast.checked_mul(10_000)?;
    let needed = eligible.checked_mul(quorum_bps as Amount)?;
    Some(votes_for > votes_against && turnout >= needed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_needs_majority_and_quorum() {
        assert_eq!(tally_passes(60, 40, 1_000, 1_000), Some(true));
        assert_eq!(tally_passes(50, 50, 100, 1_000), Some(false));
        assert_eq!(tally_passes(99, 0, 1_000, 1_000), Some(false));
        assert_eq!(tally_passes(1, 0, 0, 1_000), Some(true));
        assert_eq!(tally_passes(Amount::MAX, 1, 1, 1), None);
    }
}
