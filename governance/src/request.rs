//! Trade-finance requests voted on by financiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use tradefin_types::{Address, Amount, Timestamp};

/// Pending → Approved | Rejected; Approved → Disbursed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Disbursed,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFinanceRequest {
    pub id: u64,
    pub requester: Address,
    pub token: Address,
    pub amount: Amount,
    pub purpose: String,
    pub votes_for: Amount,
    pub votes_against: Amount,
    pub created_at: Timestamp,
    pub voting_deadline: Timestamp,
    /// Total financier voting power at submission.
    pub eligible_power: Amount,
    pub status: RequestStatus,
    pub disbursed_at: Option<Timestamp>,
}
