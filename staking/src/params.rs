//! Staking parameters.

use serde::{Deserialize, Serialize};
use tradefin_types::amount::decimal_string;
use tradefin_types::{Amount, SECS_PER_DAY, TOKEN_UNIT};

/// Tunables of the stake ledger. Every field has a default, so a partial
/// `[staking]` config section is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    #[serde(default = "default_minimum_stake", with = "decimal_string")]
    pub minimum_stake: Amount,

    #[serde(default = "default_minimum_financier_stake", with = "decimal_string")]
    pub minimum_financier_stake: Amount,

    /// Seconds.
    #[serde(default = "default_min_lock_duration")]
    pub min_lock_duration: u64,

    #[serde(default = "default_min_financier_lock_duration")]
    pub min_financier_lock_duration: u64,

    /// Lock time at which a stake reaches full voting weight.
    #[serde(default = "default_max_lock_duration")]
    pub max_lock_duration: u64,

    #[serde(default = "default_initial_apr_bps")]
    pub initial_apr_bps: u32,

    /// APR reduction per `apr_step_amount` staked in the pool.
    #[serde(default = "default_apr_reduction_per_step_bps")]
    pub apr_reduction_per_step_bps: u32,

    #[serde(default = "default_apr_step_amount", with = "decimal_string")]
    pub apr_step_amount: Amount,

    #[serde(default = "default_min_apr_bps")]
    pub min_apr_bps: u32,

    #[serde(default = "default_emergency_withdraw_penalty_bps")]
    pub emergency_withdraw_penalty_bps: u32,

    /// Delay between requesting and completing a financier revocation.
    #[serde(default = "default_revocation_period")]
    pub revocation_period: u64,
}

fn default_minimum_stake() -> Amount {
    100 * TOKEN_UNIT
}

fn default_minimum_financier_stake() -> Amount {
    10_000 * TOKEN_UNIT
}

fn default_min_lock_duration() -> u64 {
    30 * SECS_PER_DAY
}

fn default_min_financier_lock_duration() -> u64 {
    180 * SECS_PER_DAY
}

fn default_max_lock_duration() -> u64 {
    365 * SECS_PER_DAY
}

fn default_initial_apr_bps() -> u32 {
    1_200
}

fn default_apr_reduction_per_step_bps() -> u32 {
    10
}

fn default_apr_step_amount() -> Amount {
    1_000 * TOKEN_UNIT
}

fn default_min_apr_bps() -> u32 {
    200
}

fn default_emergency_withdraw_penalty_bps() -> u32 {
    1_000
}

fn default_revocation_period() -> u64 {
    7 * SECS_PER_DAY
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            minimum_stake: default_minimum_stake(),
            minimum_financier_stake: default_minimum_financier_stake(),
            min_lock_duration: default_min_lock_duration(),
            min_financier_lock_duration: default_min_financier_lock_duration(),
            max_lock_duration: default_max_lock_duration(),
            initial_apr_bps: default_initial_apr_bps(),
            apr_reduction_per_step_bps: default_apr_reduction_per_step_bps(),
            apr_step_amount: default_apr_step_amount(),
            min_apr_bps: default_min_apr_bps(),
            emergency_withdraw_penalty_bps: default_emergency_withdraw_penalty_bps(),
            revocation_period: default_revocation_period(),
        }
    }
}
