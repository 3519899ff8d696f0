//! Reward accrual and voting-power arithmetic.
//!
//! All values are integers: rates in basis points per year, time in whole
//! seconds. Accrual carries the division remainder forward in
//! `reward_debt`, so splitting an interval never loses reward.

use tradefin_types::{Amount, Timestamp, BPS_DENOMINATOR, SECS_PER_YEAR};

use crate::error::StakingError;
use crate::params::StakingParams;
use crate::stake::Stake;

/// Denominator of one year of reward at one basis point.
pub const RATE_DENOMINATOR: Amount = SECS_PER_YEAR as Amount * BPS_DENOMINATOR;

/// APR of a pool holding `total_staked`.
///
/// `max(initial − (total_staked / step) · reduction, min)`
pub fn current_rate_bps(params: &StakingParams, total_staked: Amount) -> u32 {
    let steps = if params.apr_step_amount == 0 {
        0
    } else {
        total_staked / params.apr_step_amount
    };
    let reduction = steps.saturating_mul(params.apr_reduction_per_step_bps as Amount);
    let rate = (params.initial_apr_bps as Amount).saturating_sub(reduction);
    rate.max(params.min_apr_bps as Amount) as u32
}

/// Bring `stake.pending_rewards` up to `now`.
pub fn accrue(stake: &mut Stake, rate_bps: u32, now: Timestamp) -> Result<(), StakingError> {
    let elapsed = stake.last_reward_timestamp.elapsed_since(now) as Amount;
    if stake.amount > 0 && elapsed > 0 {
        let numerator = stake
            .amount
            .checked_mul(rate_bps as Amount)
            .and_then(|v| v.checked_mul(elapsed))
            .and_then(|v| v.checked_add(stake.reward_debt))
            .ok_or(StakingError::Overflow)?;
        stake.pending_rewards = stake
            .pending_rewards
            .checked_add(numerator / RATE_DENOMINATOR)
            .ok_or(StakingError::Overflow)?;
        stake.reward_debt = numerator % RATE_DENOMINATOR;
    }
    if now > stake.last_reward_timestamp {
        stake.last_reward_timestamp = now;
    }
    Ok(())
}

/// Lock-weighted power of a single stake at `now`.
///
/// `amount · min(deadline − now, max_lock) / max_lock`, zero once the lock
/// has elapsed.
pub fn stake_voting_power(stake: &Stake, max_lock_duration: u64, now: Timestamp) -> Amount {
    if !stake.active || max_lock_duration == 0 {
        return 0;
    }
    let remaining = stake.deadline.remaining_from(now).min(max_lock_duration) as Amount;
    // amount < 2^128 / 2^64 for any realistic supply; saturate otherwise
    stake.amount.saturating_mul(remaining) / max_lock_duration as Amount
}
