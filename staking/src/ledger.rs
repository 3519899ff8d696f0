//! Stake ledger operations.

use tradefin_access::{AccessGate, AccessStore};
use tradefin_identity::{IdentityResolver, IdentityStore};
use tradefin_types::{apply_bps, Address, Amount, PriceOracle, Settlement, Timestamp};

use crate::error::StakingError;
use crate::params::StakingParams;
use crate::rewards::{accrue, current_rate_bps, stake_voting_power};
use crate::stake::{Stake, StakePool, StakeTotals, StakerAccount};
use crate::store::StakeStore;

/// The stake ledger. Holds only parameters; all state lives in the store.
pub struct StakeLedger {
    params: StakingParams,
}

impl StakeLedger {
    pub fn new(params: StakingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StakingParams {
        &self.params
    }

    /// Lock `amount` of `token` until at least `lock_deadline`.
    pub fn stake<S, O>(
        &self,
        store: &mut S,
        oracle: &O,
        caller: &Address,
        token: &Address,
        amount: Amount,
        lock_deadline: Timestamp,
        now: Timestamp,
    ) -> Result<Settlement, StakingError>
    where
        S: StakeStore + AccessStore + IdentityStore,
        O: PriceOracle,
    {
        self.add_stake(store, oracle, caller, token, amount, lock_deadline, now, false)
    }

    /// Like [`StakeLedger::stake`], but the resulting position must qualify
    /// for financier status, which it then carries.
    pub fn stake_as_financier<S, O>(
        &self,
        store: &mut S,
        oracle: &O,
        caller: &Address,
        token: &Address,
        amount: Amount,
        lock_deadline: Timestamp,
        now: Timestamp,
    ) -> Result<Settlement, StakingError>
    where
        S: StakeStore + AccessStore + IdentityStore,
        O: PriceOracle,
    {
        self.add_stake(store, oracle, caller, token, amount, lock_deadline, now, true)
    }

    #[allow(clippy::too_many_arguments)]
    fn add_stake<S, O>(
        &self,
        store: &mut S,
        oracle: &O,
        caller: &Address,
        token: &Address,
        amount: Amount,
        lock_deadline: Timestamp,
        now: Timestamp,
        financier: bool,
    ) -> Result<Settlement, StakingError>
    where
        S: StakeStore + AccessStore + IdentityStore,
        O: PriceOracle,
    {
        AccessGate::ensure_not_paused(store)?;
        let user = IdentityResolver::resolve(store, caller)?;
        AccessGate::ensure_token_supported(store, token)?;
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        if amount < self.params.minimum_stake {
            return Err(StakingError::BelowMinimumStake {
                amount,
                minimum: self.params.minimum_stake,
            });
        }
        let earliest = now.plus(self.params.min_lock_duration);
        if lock_deadline < earliest {
            return Err(StakingError::LockTooShort {
                deadline: lock_deadline,
                earliest,
            });
        }

        let mut pool = store.pool(token)?.unwrap_or_default();
        let mut stake = store
            .stake(&user, token)?
            .unwrap_or_else(|| Stake::empty(user, *token, now));
        accrue(&mut stake, current_rate_bps(&self.params, pool.total_staked), now)?;

        let was_active = stake.active;
        let new_amount = stake
            .amount
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;
        let deadline = if was_active {
            stake.deadline.max(lock_deadline)
        } else {
            lock_deadline
        };

        if financier {
            if new_amount < self.params.minimum_financier_stake {
                return Err(StakingError::BelowFinancierMinimum {
                    amount: new_amount,
                    minimum: self.params.minimum_financier_stake,
                });
            }
            let earliest = now.plus(self.params.min_financier_lock_duration);
            if deadline < earliest {
                return Err(StakingError::LockTooShort { deadline, earliest });
            }
        }

        let usd = oracle
            .quote_usd(token, new_amount)
            .map_err(|e| StakingError::OracleUnavailable(e.to_string()))?;

        if !was_active {
            stake.timestamp = now;
            pool.staker_count += 1;
        }
        stake.amount = new_amount;
        stake.usd_equivalent = usd;
        stake.deadline = deadline;
        stake.active = true;
        if financier {
            stake.is_financier = true;
            stake.revocation_requested = false;
            stake.revocation_request_time = None;
        }
        pool.total_staked = pool
            .total_staked
            .checked_add(amount)
            .ok_or(StakingError::Overflow)?;

        store.put_stake(&stake)?;
        store.put_pool(token, &pool)?;
        self.recompute(store, &user, now)?;

        tracing::info!(%user, %token, amount, financier, "staked");
        Ok(Settlement::new().pull(*token, *caller, amount))
    }

    /// Withdraw `amount` after the lock has elapsed, together with every
    /// pending reward.
    pub fn unstake<S>(
        &self,
        store: &mut S,
        caller: &Address,
        token: &Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Settlement, StakingError>
    where
        S: StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let user = IdentityResolver::resolve(store, caller)?;
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let mut stake = self.load(store, &user, token)?;
        if amount > stake.amount {
            return Err(StakingError::InsufficientStake {
                requested: amount,
                staked: stake.amount,
            });
        }
        if now < stake.deadline {
            return Err(StakingError::LockNotElapsed(stake.deadline));
        }

        let mut pool = store.pool(token)?.unwrap_or_default();
        accrue(&mut stake, current_rate_bps(&self.params, pool.total_staked), now)?;

        let rewards = stake.pending_rewards;
        let payout = amount.checked_add(rewards).ok_or(StakingError::Overflow)?;
        let remaining = stake.amount - amount;
        stake.pending_rewards = 0;

        if remaining == 0 {
            stake.zero();
            pool.staker_count = pool.staker_count.saturating_sub(1);
        } else {
            stake.usd_equivalent = stake
                .usd_equivalent
                .checked_mul(remaining)
                .map(|v| v / stake.amount)
                .ok_or(StakingError::Overflow)?;
            stake.amount = remaining;
            if remaining < self.params.minimum_financier_stake {
                stake.is_financier = false;
                stake.revocation_requested = false;
                stake.revocation_request_time = None;
            }
        }
        pool.total_staked = pool.total_staked.saturating_sub(amount);

        store.put_stake(&stake)?;
        store.put_pool(token, &pool)?;
        self.recompute(store, &user, now)?;

        tracing::info!(%user, %token, amount, rewards, "unstaked");
        Ok(Settlement::new().pay(*token, *caller, payout))
    }

    /// Leave before the lock elapses: the penalty stays in the pool and
    /// pending rewards are forfeited.
    pub fn emergency_withdraw<S>(
        &self,
        store: &mut S,
        caller: &Address,
        token: &Address,
        now: Timestamp,
    ) -> Result<Settlement, StakingError>
    where
        S: StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let user = IdentityResolver::resolve(store, caller)?;
        let mut stake = self.load(store, &user, token)?;
        if !stake.active {
            return Err(StakingError::StakeNotFound {
                user,
                token: *token,
            });
        }

        let amount = stake.amount;
        let penalty = apply_bps(amount, self.params.emergency_withdraw_penalty_bps)
            .ok_or(StakingError::Overflow)?;
        let payout = amount - penalty.min(amount);

        stake.zero();
        stake.pending_rewards = 0;
        stake.last_reward_timestamp = now;

        let mut pool = store.pool(token)?.unwrap_or_default();
        pool.total_staked = pool.total_staked.saturating_sub(amount);
        pool.staker_count = pool.staker_count.saturating_sub(1);

        store.put_stake(&stake)?;
        store.put_pool(token, &pool)?;
        self.recompute(store, &user, now)?;

        tracing::info!(%user, %token, amount, penalty, "emergency withdrawal");
        Ok(Settlement::new().pay(*token, *caller, payout))
    }

    pub fn claim_rewards<S>(
        &self,
        store: &mut S,
        caller: &Address,
        token: &Address,
        now: Timestamp,
    ) -> Result<Settlement, StakingError>
    where
        S: StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let user = IdentityResolver::resolve(store, caller)?;
        let mut stake = self.load(store, &user, token)?;
        let pool = store.pool(token)?.unwrap_or_default();
        accrue(&mut stake, current_rate_bps(&self.params, pool.total_staked), now)?;

        let rewards = stake.pending_rewards;
        if rewards == 0 {
            return Err(StakingError::NothingToClaim);
        }
        stake.pending_rewards = 0;
        stake.reward_debt = 0;
        store.put_stake(&stake)?;

        tracing::info!(%user, %token, rewards, "rewards claimed");
        Ok(Settlement::new().pay(*token, *caller, rewards))
    }

    pub fn request_financier_revocation<S>(
        &self,
        store: &mut S,
        caller: &Address,
        token: &Address,
        now: Timestamp,
    ) -> Result<(), StakingError>
    where
        S: StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let user = IdentityResolver::resolve(store, caller)?;
        let mut stake = self.load(store, &user, token)?;
        if !stake.is_financier {
            return Err(StakingError::NotFinancier(user));
        }
        if stake.revocation_requested {
            return Err(StakingError::RevocationAlreadyRequested);
        }
        stake.revocation_requested = true;
        stake.revocation_request_time = Some(now);
        store.put_stake(&stake)?;
        tracing::info!(%user, %token, "financier revocation requested");
        Ok(())
    }

    pub fn complete_financier_revocation<S>(
        &self,
        store: &mut S,
        caller: &Address,
        token: &Address,
        now: Timestamp,
    ) -> Result<(), StakingError>
    where
        S: StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let user = IdentityResolver::resolve(store, caller)?;
        let mut stake = self.load(store, &user, token)?;
        let requested_at = match (stake.revocation_requested, stake.revocation_request_time) {
            (true, Some(at)) => at,
            _ => return Err(StakingError::NoRevocationRequested),
        };
        let ready_at = requested_at.plus(self.params.revocation_period);
        if now < ready_at {
            return Err(StakingError::RevocationPending(ready_at));
        }
        stake.is_financier = false;
        stake.revocation_requested = false;
        stake.revocation_request_time = None;
        store.put_stake(&stake)?;
        self.recompute(store, &user, now)?;
        tracing::info!(%user, %token, "financier status revoked");
        Ok(())
    }

    /// Permissionless recompute of a user's voting power at `now`.
    pub fn refresh_voting_power<S>(
        &self,
        store: &mut S,
        user: &Address,
        now: Timestamp,
    ) -> Result<StakerAccount, StakingError>
    where
        S: StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let user = IdentityResolver::resolve(store, user)?;
        self.recompute(store, &user, now)
    }

    /// Recompute the user's aggregate across the whole stake set and move
    /// the global totals by the difference.
    pub fn recompute<S: StakeStore>(
        &self,
        store: &mut S,
        user: &Address,
        now: Timestamp,
    ) -> Result<StakerAccount, StakingError> {
        let mut power: Amount = 0;
        let mut is_financier = false;
        for mut stake in store.stakes_of(user)? {
            let vp = stake_voting_power(&stake, self.params.max_lock_duration, now);
            power = power.checked_add(vp).ok_or(StakingError::Overflow)?;
            is_financier |= stake.active && stake.is_financier;
            if stake.voting_power != vp {
                stake.voting_power = vp;
                store.put_stake(&stake)?;
            }
        }
        let account = StakerAccount {
            voting_power: power,
            financier_voting_power: if is_financier { power } else { 0 },
            is_financier,
        };

        let previous = store.account(user)?.unwrap_or_default();
        if previous != account {
            let mut totals = store.totals()?.unwrap_or_default();
            totals.total_voting_power = shift(
                totals.total_voting_power,
                previous.voting_power,
                account.voting_power,
            )?;
            totals.total_financier_voting_power = shift(
                totals.total_financier_voting_power,
                previous.financier_voting_power,
                account.financier_voting_power,
            )?;
            match (previous.is_financier, account.is_financier) {
                (false, true) => totals.financier_count += 1,
                (true, false) => totals.financier_count = totals.financier_count.saturating_sub(1),
                _ => {}
            }
            store.put_totals(&totals)?;
            store.put_account(user, &account)?;
        }
        Ok(account)
    }

    /// Recompute every staker at `now` and return the refreshed totals.
    /// Used before a vote snapshot so the base reflects current lock decay.
    pub fn recompute_all<S: StakeStore>(
        &self,
        store: &mut S,
        now: Timestamp,
    ) -> Result<StakeTotals, StakingError> {
        let users = store.staker_addresses()?;
        for user in &users {
            self.recompute(store, user, now)?;
        }
        tracing::debug!(stakers = users.len(), "voting power recomputed for snapshot");
        Self::totals(store)
    }

    /// Power of `user` as of `at`, counting only stakes opened at or before
    /// `at`. Read-only; ballots are weighted with this against a snapshot
    /// taken by [`recompute_all`](Self::recompute_all) at the same instant.
    pub fn power_at<S: StakeStore>(
        &self,
        store: &S,
        user: &Address,
        at: Timestamp,
    ) -> Result<StakerAccount, StakingError> {
        let mut power: Amount = 0;
        let mut is_financier = false;
        for stake in store.stakes_of(user)? {
            if !stake.active || stake.timestamp > at {
                continue;
            }
            let vp = stake_voting_power(&stake, self.params.max_lock_duration, at);
            power = power.checked_add(vp).ok_or(StakingError::Overflow)?;
            is_financier |= stake.is_financier;
        }
        Ok(StakerAccount {
            voting_power: power,
            financier_voting_power: if is_financier { power } else { 0 },
            is_financier,
        })
    }

    fn load<S: StakeStore>(
        &self,
        store: &S,
        user: &Address,
        token: &Address,
    ) -> Result<Stake, StakingError> {
        store
            .stake(user, token)?
            .ok_or(StakingError::StakeNotFound {
                user: *user,
                token: *token,
            })
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn stake_of<S: StakeStore>(
        store: &S,
        user: &Address,
        token: &Address,
    ) -> Result<Option<Stake>, StakingError> {
        Ok(store.stake(user, token)?)
    }

    pub fn stakes_of<S: StakeStore>(store: &S, user: &Address) -> Result<Vec<Stake>, StakingError> {
        Ok(store.stakes_of(user)?)
    }

    pub fn account<S: StakeStore>(store: &S, user: &Address) -> Result<StakerAccount, StakingError> {
        Ok(store.account(user)?.unwrap_or_default())
    }

    pub fn voting_power<S: StakeStore>(store: &S, user: &Address) -> Result<Amount, StakingError> {
        Ok(Self::account(store, user)?.voting_power)
    }

    pub fn is_financier<S: StakeStore>(store: &S, user: &Address) -> Result<bool, StakingError> {
        Ok(Self::account(store, user)?.is_financier)
    }

    pub fn totals<S: StakeStore>(store: &S) -> Result<StakeTotals, StakingError> {
        Ok(store.totals()?.unwrap_or_default())
    }

    pub fn pool<S: StakeStore>(store: &S, token: &Address) -> Result<StakePool, StakingError> {
        Ok(store.pool(token)?.unwrap_or_default())
    }

    pub fn current_rate<S: StakeStore>(&self, store: &S, token: &Address) -> Result<u32, StakingError> {
        let pool = Self::pool(store, token)?;
        Ok(current_rate_bps(&self.params, pool.total_staked))
    }

    /// Rewards the position would hold if accrued at `now`.
    pub fn pending_rewards<S: StakeStore>(
        &self,
        store: &S,
        user: &Address,
        token: &Address,
        now: Timestamp,
    ) -> Result<Amount, StakingError> {
        let mut stake = self.load(store, user, token)?;
        let rate = self.current_rate(store, token)?;
        accrue(&mut stake, rate, now)?;
        Ok(stake.pending_rewards)
    }
}

fn shift(total: Amount, old: Amount, new: Amount) -> Result<Amount, StakingError> {
    total
        .checked_sub(old)
        .and_then(|t| t.checked_add(new))
        .ok_or(StakingError::Overflow)
}
