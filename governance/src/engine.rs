//! Core governance engine: proposals and trade-finance requests.

use tradefin_access::{AccessGate, AccessStore};
use tradefin_identity::{IdentityResolver, IdentityStore};
use tradefin_staking::{StakeLedger, StakeStore};
use tradefin_types::{Address, Amount, Settlement, Timestamp};

use crate::error::GovernanceError;
use crate::params::GovernanceParams;
use crate::proposal::{
    tally_passes, Ballot, ExecutionApproval, Proposal, ProposalCategory, ProposalStatus,
};
use crate::request::{RequestStatus, TradeFinanceRequest};
use crate::store::GovernanceStore;

pub struct GovernanceEngine {
    params: GovernanceParams,
}

impl GovernanceEngine {
    pub fn new(params: GovernanceParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    /// Open a proposal. Every staker is recomputed first so the snapshot of
    /// total power taken here, the quorum base, reflects current lock decay.
    #[allow(clippy::too_many_arguments)]
    pub fn create_proposal<S>(
        &self,
        store: &mut S,
        stakes: &StakeLedger,
        caller: &Address,
        category: ProposalCategory,
        title: &str,
        description: &str,
        requires_multisig: bool,
        now: Timestamp,
    ) -> Result<u64, GovernanceError>
    where
        S: GovernanceStore + StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let proposer = IdentityResolver::resolve(store, caller)?;
        let title = title.trim();
        if title.is_empty() || title.chars().count() > self.params.max_title_len {
            return Err(GovernanceError::InvalidTitle {
                max: self.params.max_title_len,
            });
        }
        if description.chars().count() > self.params.max_description_len {
            return Err(GovernanceError::TextTooLong {
                max: self.params.max_description_len,
            });
        }
        let totals = stakes.recompute_all(store, now)?;
        let power = StakeLedger::voting_power(store, &proposer)?;
        if power < self.params.proposal_threshold {
            return Err(GovernanceError::InsufficientVotingPower {
                have: power,
                need: self.params.proposal_threshold,
            });
        }

        let id = store.next_proposal_id()?;
        let proposal = Proposal {
            id,
            proposer,
            category,
            title: title.to_string(),
            description: description.to_string(),
            votes_for: 0,
            votes_against: 0,
            created_at: now,
            voting_deadline: now.plus(self.params.voting_period),
            status: ProposalStatus::Active,
            executed: false,
            executed_at: None,
            requires_multisig,
            execution_approvals: 0,
            eligible_power: totals.total_voting_power,
        };
        store.put_proposal(&proposal)?;
        tracing::info!(id, %proposer, ?category, requires_multisig, "proposal created");
        Ok(id)
    }

    /// Cast the voter's power once, measured at the proposal's snapshot.
    pub fn vote<S>(
        &self,
        store: &mut S,
        stakes: &StakeLedger,
        proposal_id: u64,
        caller: &Address,
        support: bool,
        now: Timestamp,
    ) -> Result<Amount, GovernanceError>
    where
        S: GovernanceStore + StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let voter = IdentityResolver::resolve(store, caller)?;
        let mut proposal = load_proposal(store, proposal_id)?;
        if proposal.status != ProposalStatus::Active || now > proposal.voting_deadline {
            return Err(GovernanceError::VotingClosed);
        }
        if store.ballot(proposal_id, &voter)?.is_some() {
            return Err(GovernanceError::AlreadyVoted(voter));
        }
        stakes.recompute(store, &voter, now)?;
        let power = stakes.power_at(store, &voter, proposal.created_at)?.voting_power;
        if power == 0 {
            return Err(GovernanceError::NoVotingPower(voter));
        }

        let tally = if support {
            &mut proposal.votes_for
        } else {
            &mut proposal.votes_against
        };
        *tally = tally.checked_add(power).ok_or(GovernanceError::Overflow)?;
        store.put_ballot(
            proposal_id,
            &Ballot {
                voter,
                support,
                power,
                cast_at: now,
            },
        )?;
        store.put_proposal(&proposal)?;
        tracing::info!(proposal_id, %voter, support, power, "vote cast");
        Ok(power)
    }

    pub fn finalize<S>(
        &self,
        store: &mut S,
        proposal_id: u64,
        now: Timestamp,
    ) -> Result<ProposalStatus, GovernanceError>
    where
        S: GovernanceStore + AccessStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let mut proposal = load_proposal(store, proposal_id)?;
        if proposal.status != ProposalStatus::Active {
            return Err(GovernanceError::InvalidProposalStatus {
                id: proposal_id,
                status: proposal.status,
            });
        }
        if now <= proposal.voting_deadline {
            return Err(GovernanceError::VotingStillOpen(proposal.voting_deadline));
        }
        let passed = tally_passes(
            proposal.votes_for,
            proposal.votes_against,
            proposal.eligible_power,
            self.params.quorum_bps,
        )
        .ok_or(GovernanceError::Overflow)?;
        proposal.status = if passed {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Failed
        };
        store.put_proposal(&proposal)?;
        tracing::info!(proposal_id, status = %proposal.status, "proposal finalized");
        Ok(proposal.status)
    }

    pub fn cancel<S>(
        &self,
        store: &mut S,
        proposal_id: u64,
        caller: &Address,
        now: Timestamp,
    ) -> Result<(), GovernanceError>
    where
        S: GovernanceStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let caller = IdentityResolver::resolve(store, caller)?;
        let mut proposal = load_proposal(store, proposal_id)?;
        if proposal.proposer != caller && !AccessGate::is_owner(store, &caller)? {
            return Err(GovernanceError::Unauthorized(caller));
        }
        if proposal.status != ProposalStatus::Active {
            return Err(GovernanceError::InvalidProposalStatus {
                id: proposal_id,
                status: proposal.status,
            });
        }
        if now > proposal.voting_deadline {
            return Err(GovernanceError::VotingClosed);
        }
        proposal.status = ProposalStatus::Cancelled;
        store.put_proposal(&proposal)?;
        tracing::info!(proposal_id, %caller, "proposal cancelled");
        Ok(())
    }

    pub fn approve_execution<S>(
        &self,
        store: &mut S,
        proposal_id: u64,
        caller: &Address,
        now: Timestamp,
    ) -> Result<u32, GovernanceError>
    where
        S: GovernanceStore + StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let financier = IdentityResolver::resolve(store, caller)?;
        let mut proposal = load_proposal(store, proposal_id)?;
        if proposal.status != ProposalStatus::Passed {
            return Err(GovernanceError::InvalidProposalStatus {
                id: proposal_id,
                status: proposal.status,
            });
        }
        if !proposal.requires_multisig {
            return Err(GovernanceError::MultisigNotRequired);
        }
        if !StakeLedger::is_financier(store, &financier)? {
            return Err(GovernanceError::NotFinancier(financier));
        }
        if store.approval(proposal_id, &financier)?.is_some() {
            return Err(GovernanceError::AlreadyApproved(financier));
        }
        store.put_approval(
            proposal_id,
            &ExecutionApproval {
                financier,
                approved_at: now,
            },
        )?;
        proposal.execution_approvals += 1;
        store.put_proposal(&proposal)?;
        tracing::info!(proposal_id, %financier, approvals = proposal.execution_approvals, "execution approved");
        Ok(proposal.execution_approvals)
    }

    pub fn execute<S>(
        &self,
        store: &mut S,
        proposal_id: u64,
        caller: &Address,
        now: Timestamp,
    ) -> Result<(), GovernanceError>
    where
        S: GovernanceStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let caller = IdentityResolver::resolve(store, caller)?;
        let mut proposal = load_proposal(store, proposal_id)?;
        if proposal.proposer != caller && !AccessGate::is_owner(store, &caller)? {
            return Err(GovernanceError::Unauthorized(caller));
        }
        if proposal.status != ProposalStatus::Passed {
            return Err(GovernanceError::InvalidProposalStatus {
                id: proposal_id,
                status: proposal.status,
            });
        }
        if proposal.requires_multisig && proposal.execution_approvals < self.params.multisig_quorum {
            return Err(GovernanceError::InsufficientApprovals {
                have: proposal.execution_approvals,
                need: self.params.multisig_quorum,
            });
        }
        proposal.status = ProposalStatus::Executed;
        proposal.executed = true;
        proposal.executed_at = Some(now);
        store.put_proposal(&proposal)?;
        tracing::info!(proposal_id, %caller, "proposal executed");
        Ok(())
    }

    pub fn proposal<S: GovernanceStore>(
        store: &S,
        proposal_id: u64,
    ) -> Result<Option<Proposal>, GovernanceError> {
        Ok(store.proposal(proposal_id)?)
    }

    pub fn ballots<S: GovernanceStore>(
        store: &S,
        proposal_id: u64,
    ) -> Result<Vec<Ballot>, GovernanceError> {
        Ok(store.ballots(proposal_id)?)
    }

    // ── Trade-finance requests ──────────────────────────────────────────

    pub fn submit_request<S>(
        &self,
        store: &mut S,
        stakes: &StakeLedger,
        caller: &Address,
        token: &Address,
        amount: Amount,
        purpose: &str,
        now: Timestamp,
    ) -> Result<u64, GovernanceError>
    where
        S: GovernanceStore + StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let requester = IdentityResolver::resolve(store, caller)?;
        AccessGate::ensure_verified(store, &requester)?;
        AccessGate::ensure_token_supported(store, token)?;
        if amount == 0 {
            return Err(GovernanceError::ZeroAmount);
        }
        if purpose.chars().count() > self.params.max_description_len {
            return Err(GovernanceError::TextTooLong {
                max: self.params.max_description_len,
            });
        }
        let eligible = stakes.recompute_all(store, now)?.total_financier_voting_power;
        if eligible == 0 {
            return Err(GovernanceError::NoEligibleFinanciers);
        }

        let id = store.next_request_id()?;
        store.put_request(&TradeFinanceRequest {
            id,
            requester,
            token: *token,
            amount,
            purpose: purpose.to_string(),
            votes_for: 0,
            votes_against: 0,
            created_at: now,
            voting_deadline: now.plus(self.params.request_voting_period),
            eligible_power: eligible,
            status: RequestStatus::Pending,
            disbursed_at: None,
        })?;
        tracing::info!(id, %requester, amount, "trade-finance request submitted");
        Ok(id)
    }

    pub fn vote_request<S>(
        &self,
        store: &mut S,
        stakes: &StakeLedger,
        request_id: u64,
        caller: &Address,
        support: bool,
        now: Timestamp,
    ) -> Result<Amount, GovernanceError>
    where
        S: GovernanceStore + StakeStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let voter = IdentityResolver::resolve(store, caller)?;
        let mut request = load_request(store, request_id)?;
        if request.status != RequestStatus::Pending || now > request.voting_deadline {
            return Err(GovernanceError::VotingClosed);
        }
        let account = stakes.recompute(store, &voter, now)?;
        if !account.is_financier {
            return Err(GovernanceError::NotFinancier(voter));
        }
        if store.request_ballot(request_id, &voter)?.is_some() {
            return Err(GovernanceError::AlreadyVoted(voter));
        }
        let power = stakes
            .power_at(store, &voter, request.created_at)?
            .financier_voting_power;
        if power == 0 {
            return Err(GovernanceError::NoVotingPower(voter));
        }

        let tally = if support {
            &mut request.votes_for
        } else {
            &mut request.votes_against
        };
        *tally = tally.checked_add(power).ok_or(GovernanceError::Overflow)?;
        store.put_request_ballot(
            request_id,
            &Ballot {
                voter,
                support,
                power,
                cast_at: now,
            },
        )?;
        store.put_request(&request)?;
        tracing::info!(request_id, %voter, support, power, "request vote cast");
        Ok(power)
    }

    pub fn finalize_request<S>(
        &self,
        store: &mut S,
        request_id: u64,
        now: Timestamp,
    ) -> Result<RequestStatus, GovernanceError>
    where
        S: GovernanceStore + AccessStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let mut request = load_request(store, request_id)?;
        if request.status != RequestStatus::Pending {
            return Err(GovernanceError::InvalidRequestStatus {
                id: request_id,
                status: request.status,
            });
        }
        if now <= request.voting_deadline {
            return Err(GovernanceError::VotingStillOpen(request.voting_deadline));
        }
        let approved = tally_passes(
            request.votes_for,
            request.votes_against,
            request.eligible_power,
            self.params.request_quorum_bps,
        )
        .ok_or(GovernanceError::Overflow)?;
        request.status = if approved {
            RequestStatus::Approved
        } else {
            RequestStatus::Rejected
        };
        store.put_request(&request)?;
        tracing::info!(request_id, status = %request.status, "request finalized");
        Ok(request.status)
    }

    /// Owner pays out an approved request to the requester.
    pub fn disburse_request<S>(
        &self,
        store: &mut S,
        request_id: u64,
        caller: &Address,
        now: Timestamp,
    ) -> Result<Settlement, GovernanceError>
    where
        S: GovernanceStore + AccessStore + IdentityStore,
    {
        AccessGate::ensure_not_paused(store)?;
        let caller = IdentityResolver::resolve(store, caller)?;
        AccessGate::ensure_owner(store, &caller)?;
        let mut request = load_request(store, request_id)?;
        if request.status != RequestStatus::Approved {
            return Err(GovernanceError::InvalidRequestStatus {
                id: request_id,
                status: request.status,
            });
        }
        request.status = RequestStatus::Disbursed;
        request.disbursed_at = Some(now);
        store.put_request(&request)?;
        tracing::info!(request_id, amount = request.amount, "request disbursed");
        Ok(Settlement::new().pay(request.token, request.requester, request.amount))
    }

    pub fn request<S: GovernanceStore>(
        store: &S,
        request_id: u64,
    ) -> Result<Option<TradeFinanceRequest>, GovernanceError> {
        Ok(store.request(request_id)?)
    }
}

fn load_proposal<S: GovernanceStore>(store: &S, id: u64) -> Result<Proposal, GovernanceError> {
    store
        .proposal(id)?
        .ok_or(GovernanceError::ProposalNotFound(id))
}

fn load_request<S: GovernanceStore>(
    store: &S,
    id: u64,
) -> Result<TradeFinanceRequest, GovernanceError> {
    store.request(id)?.ok_or(GovernanceError::RequestNotFound(id))
}
