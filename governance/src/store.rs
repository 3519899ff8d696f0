//! Persistence for proposals, ballots and requests.

use tradefin_store::{key, StoreError, StoreTxn, Table};
use tradefin_types::Address;

use crate::proposal::{Ballot, ExecutionApproval, Proposal};
use crate::request::TradeFinanceRequest;

pub trait GovernanceStore {
    fn next_proposal_id(&mut self) -> Result<u64, StoreError>;
    fn proposal(&self, id: u64) -> Result<Option<Proposal>, StoreError>;
    fn put_proposal(&mut self, proposal: &Proposal) -> Result<(), StoreError>;

    fn ballot(&self, proposal_id: u64, voter: &Address) -> Result<Option<Ballot>, StoreError>;
    fn put_ballot(&mut self, proposal_id: u64, ballot: &Ballot) -> Result<(), StoreError>;
    fn ballots(&self, proposal_id: u64) -> Result<Vec<Ballot>, StoreError>;

    fn approval(
        &self,
        proposal_id: u64,
        financier: &Address,
    ) -> Result<Option<ExecutionApproval>, StoreError>;
    fn put_approval(
        &mut self,
        proposal_id: u64,
        approval: &ExecutionApproval,
    ) -> Result<(), StoreError>;

    fn next_request_id(&mut self) -> Result<u64, StoreError>;
    fn request(&self, id: u64) -> Result<Option<TradeFinanceRequest>, StoreError>;
    fn put_request(&mut self, request: &TradeFinanceRequest) -> Result<(), StoreError>;
    fn request_ballot(&self, request_id: u64, voter: &Address) -> Result<Option<Ballot>, StoreError>;
    fn put_request_ballot(&mut self, request_id: u64, ballot: &Ballot) -> Result<(), StoreError>;
}

fn pair_key(id: u64, addr: &Address) -> Vec<u8> {
    key::compose(&[&id.to_be_bytes(), addr.as_bytes()])
}

impl GovernanceStore for StoreTxn<'_> {
    fn next_proposal_id(&mut self) -> Result<u64, StoreError> {
        self.next_id("proposal")
    }

    fn proposal(&self, id: u64) -> Result<Option<Proposal>, StoreError> {
        self.get(Table::Proposals, &key::id(id))
    }

    fn put_proposal(&mut self, proposal: &Proposal) -> Result<(), StoreError> {
        self.put(Table::Proposals, key::id(proposal.id), proposal)
    }

    fn ballot(&self, proposal_id: u64, voter: &Address) -> Result<Option<Ballot>, StoreError> {
        self.get(Table::ProposalVotes, &pair_key(proposal_id, voter))
    }

    fn put_ballot(&mut self, proposal_id: u64, ballot: &Ballot) -> Result<(), StoreError> {
        self.put(Table::ProposalVotes, pair_key(proposal_id, &ballot.voter), ballot)
    }

    fn ballots(&self, proposal_id: u64) -> Result<Vec<Ballot>, StoreError> {
        let prefix = key::compose(&[&proposal_id.to_be_bytes()]);
        Ok(self
            .scan::<Ballot>(Table::ProposalVotes, &prefix)?
            .into_iter()
            .map(|(_, b)| b)
            .collect())
    }

    fn approval(
        &self,
        proposal_id: u64,
        financier: &Address,
    ) -> Result<Option<ExecutionApproval>, StoreError> {
        self.get(Table::ExecutionApprovals, &pair_key(proposal_id, financier))
    }

    fn put_approval(
        &mut self,
        proposal_id: u64,
        approval: &ExecutionApproval,
    ) -> Result<(), StoreError> {
        self.put(
            Table::ExecutionApprovals,
            pair_key(proposal_id, &approval.financier),
            approval,
        )
    }

    fn next_request_id(&mut self) -> Result<u64, StoreError> {
        self.next_id("finance_request")
    }

    fn request(&self, id: u64) -> Result<Option<TradeFinanceRequest>, StoreError> {
        self.get(Table::FinanceRequests, &key::id(id))
    }

    fn put_request(&mut self, request: &TradeFinanceRequest) -> Result<(), StoreError> {
        self.put(Table::FinanceRequests, key::id(request.id), request)
    }

    fn request_ballot(&self, request_id: u64, voter: &Address) -> Result<Option<Ballot>, StoreError> {
        self.get(Table::FinanceRequestVotes, &pair_key(request_id, voter))
    }

    fn put_request_ballot(&mut self, request_id: u64, ballot: &Ballot) -> Result<(), StoreError> {
        self.put(
            Table::FinanceRequestVotes,
            pair_key(request_id, &ballot.voter),
            ballot,
        )
    }
}
