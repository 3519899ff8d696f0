//! Stake records and the aggregates derived from them.

use serde::{Deserialize, Serialize};
use tradefin_types::{Address, Amount, Timestamp};

/// One user's position in one token. Created on first stake and never
/// deleted; a full withdrawal zeroes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub user: Address,
    pub token: Address,
    pub amount: Amount,
    pub usd_equivalent: Amount,
    /// When the position last became active.
    pub timestamp: Timestamp,
    /// Lock expiry.
    pub deadline: Timestamp,
    /// Lock-weighted power at the last recompute.
    pub voting_power: Amount,
    /// Always `amount > 0`.
    pub active: bool,
    pub is_financier: bool,
    pub pending_rewards: Amount,
    /// Sub-unit remainder of reward accrual.
    pub reward_debt: Amount,
    pub last_reward_timestamp: Timestamp,
    pub revocation_requested: bool,
    pub revocation_request_time: Option<Timestamp>,
}

impl Stake {
    pub fn empty(user: Address, token: Address, now: Timestamp) -> Self {
        Self {
            user,
            token,
            amount: 0,
            usd_equivalent: 0,
            timestamp: now,
            deadline: now,
            voting_power: 0,
            active: false,
            is_financier: false,
            pending_rewards: 0,
            reward_debt: 0,
            last_reward_timestamp: now,
            revocation_requested: false,
            revocation_request_time: None,
        }
    }

    /// Reset after a full withdrawal. Pending rewards are left to the caller.
    pub(crate) fn zero(&mut self) {
        self.amount = 0;
        self.usd_equivalent = 0;
        self.voting_power = 0;
        self.active = false;
        self.is_financier = false;
        self.reward_debt = 0;
        self.revocation_requested = false;
        self.revocation_request_time = None;
    }
}

/// Per-token pool totals. `total_staked` drives the APR decay.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePool {
    pub total_staked: Amount,
    /// Number of active stakes in this token.
    pub staker_count: u64,
}

/// Per-user aggregate across the whole stake set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerAccount {
    pub voting_power: Amount,
    /// Equal to `voting_power` while any stake carries financier status.
    pub financier_voting_power: Amount,
    pub is_financier: bool,
}

/// Sum over every [`StakerAccount`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeTotals {
    pub total_voting_power: Amount,
    pub total_financier_voting_power: Amount,
    pub financier_count: u64,
}
